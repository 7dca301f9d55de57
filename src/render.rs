// Terminal rendering - arena grid and stats panel as ratatui lines
use colorgrad::Gradient;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use std::collections::HashMap;

use crate::arena::Arena;
use crate::powerups::Effect;
use crate::skins::SkinTable;
use crate::snake::Snake;
use crate::stats::ArenaStats;
use crate::types::Position;

const EMPTY: &str = "· ";
const FOOD: &str = "● ";
const BODY: &str = "██";
const FADED: &str = "░░";

/// Pre-built skin gradients, indexed like the skin table
pub struct Palette {
    gradients: Vec<Option<Gradient>>,
}

impl Palette {
    pub fn new(skins: &SkinTable) -> Self {
        let gradients = skins
            .skins
            .iter()
            .map(|skin| match skin.gradient() {
                Ok(g) => Some(g),
                Err(e) => {
                    tracing::warn!(skin = %skin.id, error = %e, "Invalid skin colours");
                    None
                }
            })
            .collect();
        Palette { gradients }
    }

    /// Colour of body cell `index` out of `len`, head at 0
    pub fn body_color(&self, skin: usize, index: usize, len: usize) -> Color {
        let Some(Some(gradient)) = self.gradients.get(skin) else {
            return Color::Gray;
        };
        let t = if len > 1 { index as f64 / (len - 1) as f64 } else { 0.0 };
        let rgba = gradient.at(t).to_rgba8();
        Color::Rgb(rgba[0], rgba[1], rgba[2])
    }
}

// Each board cell is two terminal columns wide so the grid looks square
fn snake_cells(snake: &Snake, palette: &Palette, cells: &mut HashMap<Position, Span<'static>>) {
    let len = snake.len();
    for (index, pos) in snake.body.iter().enumerate() {
        let span = if !snake.alive {
            Span::styled(FADED, Style::default().fg(Color::DarkGray))
        } else {
            let color = palette.body_color(snake.skin, index, len);
            let text = if snake.holds(Effect::Invisible) { FADED } else { BODY };
            let mut style = Style::default().fg(color);
            if index == 0 && snake.is_player {
                style = style.add_modifier(Modifier::BOLD);
            }
            if index == 0 && snake.holds(Effect::Shield) {
                style = style.bg(Color::Blue);
            }
            Span::styled(text, style)
        };
        cells.insert(*pos, span);
    }
}

/// One line per board row
pub fn grid_lines(arena: &Arena, palette: &Palette) -> Vec<Line<'static>> {
    let mut cells: HashMap<Position, Span<'static>> = HashMap::new();

    for pos in arena.food() {
        cells.insert(*pos, Span::styled(FOOD, Style::default().fg(Color::Red)));
    }
    for item in arena.power_up_items() {
        let glyph = format!("{} ", item.effect.spec().glyph);
        cells.insert(item.position, Span::styled(glyph, Style::default().fg(Color::Yellow)));
    }
    // Dead agents first so living bodies draw over them
    let agents = arena.agents();
    for snake in agents.iter().filter(|s| !s.alive) {
        snake_cells(snake, palette, &mut cells);
    }
    for snake in agents.iter().filter(|s| s.alive) {
        snake_cells(snake, palette, &mut cells);
    }

    let grid = arena.grid_size();
    (0..grid)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..grid)
                .map(|x| {
                    cells
                        .remove(&Position::new(x, y))
                        .unwrap_or_else(|| Span::styled(EMPTY, Style::default().fg(Color::DarkGray)))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Scoreboard, player status and active effects
pub fn stats_lines(stats: &ArenaStats, skins: &SkinTable) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let player = match stats.player_score {
        Some(score) if stats.is_player_alive => format!("Score: {}", score),
        Some(score) => format!("Score: {} (dead)", score),
        None => "Spectating".to_string(),
    };
    lines.push(Line::from(Span::styled(player, Style::default().add_modifier(Modifier::BOLD))));
    let difficulty = if stats.player_score.is_some() {
        format!("Difficulty: {} (follows score)", stats.difficulty)
    } else {
        format!("Difficulty: {}", stats.difficulty)
    };
    lines.push(Line::from(difficulty));
    lines.push(Line::from(format!("Alive: {}  Food: {}", stats.alive_agent_count, stats.food_count)));
    lines.push(Line::from(format!(
        "Time: {:.1}s  Tick: {}",
        stats.elapsed_ms as f64 / 1000.0,
        stats.tick
    )));
    lines.push(Line::from(format!("Skins: {}/{}", stats.unlocked_skin_count, skins.len())));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("Top agents", Style::default().fg(Color::Gray))));
    for (rank, agent) in stats.top_agents.iter().enumerate() {
        let name = skins.get(agent.skin).map(|s| s.name.as_str()).unwrap_or("?");
        let who = if agent.is_player { "you" } else { name };
        let mut style = Style::default();
        if !agent.alive {
            style = style.fg(Color::DarkGray);
        } else if agent.is_player {
            style = style.fg(Color::Green);
        }
        lines.push(Line::from(Span::styled(
            format!("{}. #{:<3} {:<8} {:>5}", rank + 1, agent.id, who, agent.score),
            style,
        )));
    }

    if !stats.active_player_power_ups.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Power-ups", Style::default().fg(Color::Gray))));
        for active in &stats.active_player_power_ups {
            let spec = active.effect.spec();
            lines.push(Line::from(Span::styled(
                format!("{} {:<9} {:.1}s", spec.glyph, spec.name, active.remaining_ms as f64 / 1000.0),
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    lines
}

/// Full frame: header, board, stats panel and key help
pub fn draw(frame: &mut Frame, arena: &Arena, stats: Option<&ArenaStats>, palette: &Palette, status: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
        .split(frame.size());

    let config = arena.config();
    let header = Paragraph::new(Line::from(vec![
        Span::raw(format!(
            "Snake Arena | {}x{} | {} agents | x{:.2} speed",
            config.grid_size, config.grid_size, config.agent_count, config.speed_multiplier
        )),
        Span::styled(format!("  {}", status), Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let board_width = (arena.grid_size() as u16).saturating_mul(2).saturating_add(2);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(board_width), Constraint::Min(24)])
        .split(chunks[1]);

    let board = Paragraph::new(grid_lines(arena, palette)).block(Block::default().borders(Borders::ALL).title("Arena"));
    frame.render_widget(board, body[0]);

    let panel_lines = stats.map(|s| stats_lines(s, arena.skins())).unwrap_or_default();
    let panel = Paragraph::new(panel_lines).block(Block::default().borders(Borders::ALL).title("Stats"));
    frame.render_widget(panel, body[1]);

    let footer = Paragraph::new(key_help(config.player_enabled))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, chunks[2]);
}

/// Key help for the footer. Difficulty keys are only offered without a player,
/// since the player's score sets the difficulty otherwise.
pub fn key_help(player_enabled: bool) -> &'static str {
    if player_enabled {
        "Arrows/WASD steer | p pause | r restart | +/- agents | [/] speed | q quit"
    } else {
        "Arrows/WASD steer | p pause | r restart | +/- agents | 1/2/3 difficulty | [/] speed | q quit"
    }
}

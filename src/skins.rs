// Skin table - cosmetic agent colours and their score unlock thresholds
use anyhow::Result;
use colorgrad::{Color, Gradient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    pub id: String,
    pub name: String,
    pub unlock_score: u32,
    pub colors: Vec<String>, // hex, head colour first
}

impl Skin {
    fn new(id: &str, name: &str, unlock_score: u32, colors: &[&str]) -> Self {
        Skin {
            id: id.to_string(),
            name: name.to_string(),
            unlock_score,
            colors: colors.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Head-to-tail gradient for this skin. A single colour becomes a solid gradient.
    pub fn gradient(&self) -> Result<Gradient> {
        let mut colors = Vec::new();
        for hex in &self.colors {
            colors.push(Color::from_html(hex)?);
        }
        if colors.is_empty() {
            anyhow::bail!("Skin '{}' has no colours", self.id);
        }
        if colors.len() == 1 {
            colors.push(colors[0].clone());
        }
        let gradient = colorgrad::CustomGradient::new().colors(&colors).build()?;
        Ok(gradient)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinTable {
    pub skins: Vec<Skin>,
}

impl Default for SkinTable {
    fn default() -> Self {
        SkinTable {
            skins: vec![
                Skin::new("classic", "Classic", 0, &["#39ff14", "#0b6e00"]),
                Skin::new("ocean", "Ocean", 0, &["#00c3ff", "#004e92"]),
                Skin::new("ember", "Ember", 0, &["#ffb347", "#ff3c00"]),
                Skin::new("violet", "Violet", 50, &["#e0aaff", "#5a189a"]),
                Skin::new("gold", "Gold", 100, &["#fff3b0", "#d4a017"]),
                Skin::new("rainbow", "Rainbow", 200, &["#ff0000", "#ffff00", "#00ff00", "#00ffff", "#0000ff", "#ff00ff"]),
                Skin::new("ghost", "Ghost", 300, &["#ffffff", "#6c757d"]),
                Skin::new("inferno", "Inferno", 500, &["#fcffa4", "#f98e09", "#bc3754", "#57106e"]),
            ],
        }
    }
}

impl SkinTable {
    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Skin> {
        self.skins.get(index)
    }

    /// Number of skins whose unlock threshold `score` has reached
    pub fn unlocked_count(&self, score: u32) -> usize {
        self.skins.iter().filter(|s| s.unlock_score <= score).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlocked_count_by_threshold() {
        let table = SkinTable::default();
        assert_eq!(table.unlocked_count(0), 3);
        assert_eq!(table.unlocked_count(50), 4);
        assert_eq!(table.unlocked_count(99), 4);
        assert_eq!(table.unlocked_count(10_000), table.len());
    }

    #[test]
    fn test_default_gradients_build() {
        for skin in SkinTable::default().skins {
            let gradient = skin.gradient().unwrap();
            let head = gradient.at(0.0).to_rgba8();
            assert_eq!(head[3], 255);
        }
    }

    #[test]
    fn test_single_colour_skin_is_solid() {
        let skin = Skin::new("flat", "Flat", 0, &["#ff0000"]);
        let gradient = skin.gradient().unwrap();
        assert_eq!(gradient.at(0.0).to_rgba8(), gradient.at(1.0).to_rgba8());
    }

    #[test]
    fn test_bad_hex_rejected() {
        let skin = Skin::new("bad", "Bad", 0, &["#zzzzzz"]);
        assert!(skin.gradient().is_err());
    }
}

use earth_scene::TileKey;

/// Tile URL pattern such as `https://host/{z}/{x}/{y}.png`.
///
/// Placeholders: `{z}` or `{level}`, `{x}`, `{y}`, and `{reverseY}` for
/// tile services that count rows from the south.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}
impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
    /// `base/{level}/{x}/{y}.png`
    pub fn from_base(base: &str) -> Self {
        Self::new(format!("{}/{{level}}/{{x}}/{{y}}.png", base.trim_end_matches('/')))
    }
    pub fn as_str(&self) -> &str {
        &self.template
    }
    /// `y_tiles_at_level` is the number of rows at the key's level.
    pub fn resolve(&self, key: &TileKey, y_tiles_at_level: u32) -> String {
        let reverse_y = y_tiles_at_level.saturating_sub(1).saturating_sub(key.y);
        self.template
            .replace("{level}", &key.level.to_string())
            .replace("{z}", &key.level.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{reverseY}", &reverse_y.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_placeholders() {
        let template = UrlTemplate::new("http://tiles/{z}/{x}/{y}.png?l={level}");
        assert_eq!(
            template.resolve(&TileKey::new(3, 1, 2), 4),
            "http://tiles/2/3/1.png?l=2"
        );
        let tms = UrlTemplate::new("http://tms/{z}/{x}/{reverseY}.png");
        assert_eq!(tms.resolve(&TileKey::new(3, 1, 2), 4), "http://tms/2/3/2.png");
    }

    #[test]
    fn from_base_appends_the_default_layout() {
        let template = UrlTemplate::from_base("http://host/tiles/");
        assert_eq!(template.as_str(), "http://host/tiles/{level}/{x}/{y}.png");
        assert_eq!(template.resolve(&TileKey::new(0, 0, 0), 1), "http://host/tiles/0/0/0.png");
    }
}

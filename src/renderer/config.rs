//! Preview output options

/// How [`render_layout`](super::render_layout) writes its SVG
#[derive(Debug, Clone)]
pub struct SvgConfig {
    /// Empty space kept around the device frame
    pub frame_margin: f64,
    /// Emit the `<?xml ...?>` header
    pub xml_declaration: bool,
    /// One element per line, nested groups indented
    pub indent: bool,
    /// Prepended to every class name; `None` leaves classes bare
    pub class_prefix: Option<String>,
    pub show_frame: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            frame_margin: 20.0,
            xml_declaration: true,
            indent: true,
            class_prefix: Some("dl-".to_string()),
            show_frame: true,
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line output without the XML header, for embedding
    pub fn inline() -> Self {
        Self {
            xml_declaration: false,
            indent: false,
            ..Self::default()
        }
    }

    pub fn with_frame_margin(mut self, margin: f64) -> Self {
        self.frame_margin = margin;
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    pub fn with_indent(mut self, enabled: bool) -> Self {
        self.indent = enabled;
        self
    }

    pub fn with_class_prefix(mut self, prefix: Option<&str>) -> Self {
        self.class_prefix = prefix.map(str::to_string);
        self
    }

    pub fn with_frame(mut self, shown: bool) -> Self {
        self.show_frame = shown;
        self
    }

    /// Full class attribute value for `name`
    pub(crate) fn class(&self, name: &str) -> String {
        match &self.class_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_keeps_styling_defaults() {
        let config = SvgConfig::inline();
        assert!(!config.xml_declaration && !config.indent);
        assert!(config.show_frame);
        assert_eq!(config.class("frame"), "dl-frame");
    }

    #[test]
    fn test_bare_class_names() {
        let config = SvgConfig::new().with_class_prefix(None).with_frame(false);
        assert_eq!(config.class("asset"), "asset");
        assert!(!config.show_frame);
    }
}

//! SVG generation from resolved layouts

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::device::DeviceProfile;
use crate::editor::Editor;
use crate::layout::{
    BoundingBox, ContainerId, LayoutState, Orientation, ResolvedAsset, ResolvedLayout, Resolver,
};
use crate::library::AssetLibrary;

use super::SvgConfig;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            elements: vec![],
            indent: 1,
        }
    }

    fn indent_str(&self) -> String {
        if self.config.indent {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.indent {
            "\n"
        } else {
            ""
        }
    }

    /// Add a rectangle with the given class suffix
    pub fn add_rect(&mut self, id: Option<&str>, bounds: &BoundingBox, class: &str, transform: Option<&str>) {
        let id_attr = id.map(|i| format!(r#" id="{}""#, escape_xml(i))).unwrap_or_default();
        let transform_attr = transform
            .map(|t| format!(r#" transform="{}""#, t))
            .unwrap_or_default();
        self.elements.push(format!(
            r#"{}<rect{} class="{}" x="{}" y="{}" width="{}" height="{}"{}/>"#,
            self.indent_str(),
            id_attr,
            self.config.class(class),
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            transform_attr
        ));
    }

    /// Add an image from encoded PNG bytes as a data URL
    pub fn add_image(&mut self, id: &str, bounds: &BoundingBox, png: &[u8], transform: Option<&str>) {
        let transform_attr = transform
            .map(|t| format!(r#" transform="{}""#, t))
            .unwrap_or_default();
        self.elements.push(format!(
            r#"{}<image id="{}" class="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" href="data:image/png;base64,{}"{}/>"#,
            self.indent_str(),
            escape_xml(id),
            self.config.class("asset"),
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            BASE64_STANDARD.encode(png),
            transform_attr
        ));
    }

    /// Add a group element with optional ID and a class suffix
    pub fn start_group(&mut self, id: Option<&str>, class: &str) {
        let id_attr = id.map(|i| format!(r#" id="{}""#, escape_xml(i))).unwrap_or_default();
        self.elements.push(format!(
            r#"{}<g{} class="{}">"#,
            self.indent_str(),
            id_attr,
            self.config.class(class)
        ));
        self.indent += 1;
    }

    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Wrap the collected elements in an `<svg>` whose viewBox is `frame`
    /// grown by the configured margin
    pub fn finish(self, frame: BoundingBox) -> String {
        let m = self.config.frame_margin;
        let nl = self.newline();

        let mut lines = Vec::with_capacity(self.elements.len() + 3);
        if self.config.xml_declaration {
            lines.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string());
        }
        lines.push(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            frame.x - m,
            frame.y - m,
            frame.width + 2.0 * m,
            frame.height + 2.0 * m
        ));
        lines.extend(self.elements.iter().cloned());
        lines.push("</svg>".to_string());
        lines.join(nl)
    }
}

/// Render the editor's current layout in one orientation
pub fn render_preview(editor: &Editor, orientation: Orientation, config: &SvgConfig) -> String {
    render_layout(
        editor.state(),
        editor.library(),
        editor.device(),
        orientation,
        config,
    )
}

/// Render `state` in one orientation: frame, containers (parents first), then
/// each container's visible assets bottom to top
pub fn render_layout(
    state: &LayoutState,
    library: &AssetLibrary,
    device: &DeviceProfile,
    orientation: Orientation,
    config: &SvgConfig,
) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    let frame = device.frame(orientation);
    let frame_box = BoundingBox::new(0.0, 0.0, frame.width, frame.height);

    if config.show_frame {
        builder.add_rect(Some(&device.id), &frame_box, "frame", None);
    }

    let resolved = Resolver::new(state, library, orientation).resolve_all();
    render_level(&mut builder, state, library, &resolved, None);

    builder.finish(frame_box)
}

fn render_level(
    builder: &mut SvgBuilder,
    state: &LayoutState,
    library: &AssetLibrary,
    resolved: &ResolvedLayout,
    parent: Option<&ContainerId>,
) {
    // children_of is top first; paint bottom first
    for container in state.children_of(parent).into_iter().rev() {
        let Some(bounds) = resolved.containers.get(&container.id) else {
            continue;
        };
        builder.start_group(Some(container.id.as_str()), "layer");
        builder.add_rect(None, bounds, "container", None);

        for asset in container.assets_by_depth().into_iter().rev() {
            let Some(placed) = resolved.asset(&container.id, &asset.id) else {
                continue;
            };
            if !placed.visible {
                continue;
            }
            let transform = rotation_attr(placed);
            match library.get(&asset.key).and_then(|e| e.bytes.as_deref()) {
                Some(png) => builder.add_image(asset.id.as_str(), &placed.bounds, png, transform.as_deref()),
                None => builder.add_rect(
                    Some(asset.id.as_str()),
                    &placed.bounds,
                    "placeholder",
                    transform.as_deref(),
                ),
            }
        }

        render_level(builder, state, library, resolved, Some(&container.id));
        builder.end_group();
    }
}

fn rotation_attr(asset: &ResolvedAsset) -> Option<String> {
    (asset.rotation.rem_euclid(360.0) != 0.0).then(|| {
        format!(
            "rotate({} {} {})",
            asset.rotation, asset.origin.x, asset.origin.y
        )
    })
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{AssetTransformPatch, ContainerPosition, ContainerPositionPatch};
    use crate::library::tests::blank_png;

    fn compact() -> SvgConfig {
        SvgConfig::inline()
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("Tom & \"Jerry\""), "Tom &amp; &quot;Jerry&quot;");
    }

    #[test]
    fn test_empty_layout_draws_frame() {
        let editor = Editor::default();
        let svg = render_preview(&editor, Orientation::Landscape, &compact().with_frame_margin(0.0));
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 844 390">"#));
        assert!(svg.contains(r#"class="dl-frame""#));
    }

    #[test]
    fn test_unloaded_asset_is_skipped_and_loaded_one_is_embedded() {
        let mut editor = Editor::default();
        let container = editor.add_container(None).unwrap();
        let pending = editor.add_asset(&container).unwrap();
        let loaded = editor.add_asset(&container).unwrap();
        editor.update_asset_key(&container, &pending, "later").unwrap();
        editor.update_asset_key(&container, &loaded, "logo").unwrap();
        editor.insert_image_png("logo", blank_png(2, 2)).unwrap();

        let svg = render_preview(&editor, Orientation::Portrait, &compact());
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.contains(&format!(r#"id="{}""#, loaded)));
        assert!(!svg.contains(&format!(r#"id="{}""#, pending)));
    }

    #[test]
    fn test_hidden_asset_is_skipped_and_rotation_applied() {
        let mut editor = Editor::default();
        let container = editor.add_container(None).unwrap();
        editor
            .update_container(
                &container,
                &ContainerPositionPatch::replace(ContainerPosition::new(100.0, 100.0, 100.0, 100.0)),
                Orientation::Portrait,
            )
            .unwrap();
        let asset = editor.add_asset(&container).unwrap();
        editor.update_asset_key(&container, &asset, "img").unwrap();
        editor.image_loaded("img", 10, 10);
        editor
            .update_asset(
                &container,
                &asset,
                &AssetTransformPatch::new().with_rotation(45.0),
                Orientation::Portrait,
            )
            .unwrap();

        let svg = render_preview(&editor, Orientation::Portrait, &compact());
        assert!(svg.contains(r#"transform="rotate(45 100 100)""#));
        assert!(svg.contains(r#"class="dl-placeholder""#));

        editor.toggle_visibility(&container, &asset, Orientation::Portrait).unwrap();
        let svg = render_preview(&editor, Orientation::Portrait, &compact());
        assert!(!svg.contains("dl-placeholder"));
    }

    #[test]
    fn test_children_render_inside_parent_group() {
        let mut editor = Editor::default();
        let parent = editor.add_container(None).unwrap();
        let child = editor.add_container(Some(&parent)).unwrap();

        let svg = render_preview(&editor, Orientation::Portrait, &compact());
        let parent_at = svg.find(&format!(r#"<g id="{}""#, parent)).unwrap();
        let child_at = svg.find(&format!(r#"<g id="{}""#, child)).unwrap();
        assert!(parent_at < child_at);
    }
}

use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Icons bundled with the app, drawn at whatever size the overlay needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinIcon {
    Dog,
    Cat,
    Star,
    Heart,
    Sun,
}

/// Smallest overlay edge the built-in shapes can be drawn at
pub const MIN_ICON_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconAsset {
    Builtin(BuiltinIcon),
    File(PathBuf),
}

impl IconAsset {
    /// Renders the icon into a square `size`x`size` RGBA image
    pub fn resolve(&self, size: u32) -> Result<RgbaImage> {
        if size < MIN_ICON_SIZE {
            return Err(anyhow!("Icon size {} is below the minimum of {}", size, MIN_ICON_SIZE));
        }
        match self {
            IconAsset::Builtin(icon) => Ok(draw_builtin(*icon, size)),
            IconAsset::File(path) => {
                let img = image::open(path)
                    .with_context(|| format!("Failed to load icon asset {}", path.display()))?;
                Ok(imageops::resize(&img.to_rgba8(), size, size, imageops::FilterType::Triangle))
            }
        }
    }

    pub fn is_resolvable(&self) -> bool {
        match self {
            IconAsset::Builtin(_) => true,
            IconAsset::File(path) => path.is_file(),
        }
    }
}

fn draw_builtin(icon: BuiltinIcon, size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let s = size as i32;
    let c = s / 2;

    match icon {
        BuiltinIcon::Dog => {
            let brown = Rgba([150, 100, 50, 255]);
            draw_filled_circle_mut(&mut img, (c, c + s / 10), s * 3 / 10, brown);
            // ears
            draw_filled_circle_mut(&mut img, (s / 5, s / 4), s / 6, Rgba([110, 70, 30, 255]));
            draw_filled_circle_mut(&mut img, (s - s / 5, s / 4), s / 6, Rgba([110, 70, 30, 255]));
            draw_filled_circle_mut(&mut img, (c, c + s / 5), (s / 12).max(1), Rgba([20, 20, 20, 255]));
        }
        BuiltinIcon::Cat => {
            let grey = Rgba([160, 160, 170, 255]);
            draw_polygon_mut(
                &mut img,
                &[Point::new(s / 8, s / 2), Point::new(s / 5, s / 12), Point::new(c, s / 3)],
                grey,
            );
            draw_polygon_mut(
                &mut img,
                &[Point::new(s - s / 8, s / 2), Point::new(s - s / 5, s / 12), Point::new(c, s / 3)],
                grey,
            );
            draw_filled_circle_mut(&mut img, (c, c + s / 10), s * 3 / 10, grey);
        }
        BuiltinIcon::Star => {
            let points: Vec<Point<i32>> = (0..10)
                .map(|i| {
                    let radius = if i % 2 == 0 { s as f32 * 0.48 } else { s as f32 * 0.2 };
                    let angle = std::f32::consts::PI * (i as f32 / 5.0) - std::f32::consts::FRAC_PI_2;
                    Point::new(
                        (c as f32 + radius * angle.cos()).round() as i32,
                        (c as f32 + radius * angle.sin()).round() as i32,
                    )
                })
                .collect();
            draw_polygon_mut(&mut img, &points, Rgba([255, 210, 0, 255]));
        }
        BuiltinIcon::Heart => {
            let red = Rgba([220, 30, 60, 255]);
            draw_filled_circle_mut(&mut img, (s * 3 / 10, s * 3 / 8), s / 4, red);
            draw_filled_circle_mut(&mut img, (s * 7 / 10, s * 3 / 8), s / 4, red);
            draw_polygon_mut(
                &mut img,
                &[Point::new(s / 20, s * 9 / 20), Point::new(s - s / 20, s * 9 / 20), Point::new(c, s - s / 16)],
                red,
            );
        }
        BuiltinIcon::Sun => {
            let yellow = Rgba([255, 180, 0, 255]);
            let ray = (s / 10).max(1) as u32;
            draw_filled_rect_mut(&mut img, Rect::at(c - ray as i32 / 2, 0).of_size(ray, size), yellow);
            draw_filled_rect_mut(&mut img, Rect::at(0, c - ray as i32 / 2).of_size(size, ray), yellow);
            draw_filled_circle_mut(&mut img, (c, c), s / 3, yellow);
        }
    }

    img
}

/// A decorative overlay the user can stamp onto a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub icon: IconAsset,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>, icon: IconAsset) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCategory {
    pub name: String,
    #[serde(default)]
    pub templates: Vec<Template>,
}

/// Templates grouped by category, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub default_category: String,
    pub categories: Vec<TemplateCategory>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        let builtin = |id: &str, name: &str, icon| Template::new(id, name, IconAsset::Builtin(icon));
        Self {
            default_category: "Popular".to_string(),
            categories: vec![
                TemplateCategory {
                    name: "Popular".to_string(),
                    templates: vec![
                        builtin("1", "Dog", BuiltinIcon::Dog),
                        builtin("2", "Cat", BuiltinIcon::Cat),
                        builtin("3", "Star", BuiltinIcon::Star),
                    ],
                },
                TemplateCategory {
                    name: "Animals".to_string(),
                    templates: vec![
                        builtin("1", "Dog", BuiltinIcon::Dog),
                        builtin("2", "Cat", BuiltinIcon::Cat),
                    ],
                },
                TemplateCategory {
                    name: "Mood".to_string(),
                    templates: vec![
                        builtin("4", "Heart", BuiltinIcon::Heart),
                        builtin("5", "Sunny", BuiltinIcon::Sun),
                    ],
                },
            ],
        }
    }
}

impl TemplateCatalog {
    /// Loads a catalog file; relative icon paths are taken relative to the file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template catalog: {}", path.display()))?;
        let mut catalog: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse template catalog: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for template in catalog.categories.iter_mut().flat_map(|c| c.templates.iter_mut()) {
            if let IconAsset::File(icon_path) = &mut template.icon {
                if icon_path.is_relative() {
                    *icon_path = base.join(&*icon_path);
                }
            }
        }

        catalog.validate()?;
        info!(
            "Template catalog loaded from {} ({} categories)",
            path.display(),
            catalog.categories.len()
        );
        Ok(catalog)
    }

    /// Looks for `templates.toml` in `dir`, falling back to the built-in catalog
    pub fn load_or_default<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join("templates.toml");
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            debug!("No template catalog at {}, using built-in templates", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.category(&self.default_category).is_none() {
            return Err(anyhow!("Default category '{}' is not in the catalog", self.default_category));
        }
        Ok(())
    }

    pub fn sections(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    fn category(&self, name: &str) -> Option<&TemplateCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Items for a category; unknown names show the default category instead
    pub fn items_for(&self, category: &str) -> &[Template] {
        match self.category(category).or_else(|| self.category(&self.default_category)) {
            Some(found) => found.templates.as_slice(),
            None => &[],
        }
    }

    pub fn find(&self, id: &str) -> Option<&Template> {
        self.categories
            .iter()
            .flat_map(|c| c.templates.iter())
            .find(|t| t.id == id)
    }
}

/// Parameters handed back to the capture screen when the selector closes.
/// The selection is delivered once; later focus events see nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    selected_template: Option<Template>,
}

impl RouteParams {
    pub fn with_template(template: Template) -> Self {
        Self {
            selected_template: Some(template),
        }
    }

    pub fn take_selected_template(&mut self) -> Option<Template> {
        self.selected_template.take()
    }
}

pub struct TemplateSelector {
    catalog: TemplateCatalog,
}

impl TemplateSelector {
    pub fn new(catalog: TemplateCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Picks a template and produces the navigation parameters for the capture screen
    pub fn select_template(&self, template: &Template) -> Result<RouteParams> {
        if !template.icon.is_resolvable() {
            warn!("Template '{}' has no resolvable icon", template.name);
            return Err(anyhow!("Template '{}' has no resolvable icon", template.name));
        }
        info!("Template selected: {} ({})", template.name, template.id);
        Ok(RouteParams::with_template(template.clone()))
    }

    pub fn select_by_id(&self, id: &str) -> Result<RouteParams> {
        let template = self
            .catalog
            .find(id)
            .ok_or_else(|| anyhow!("Unknown template id: {}", id))?;
        self.select_template(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_icons_resolve() {
        for icon in [BuiltinIcon::Dog, BuiltinIcon::Cat, BuiltinIcon::Star, BuiltinIcon::Heart, BuiltinIcon::Sun] {
            let img = IconAsset::Builtin(icon).resolve(48).unwrap();
            assert_eq!(img.dimensions(), (48, 48));
            assert!(img.pixels().any(|p| p[3] > 0), "{:?} drew nothing", icon);
        }
    }

    #[test]
    fn test_icon_too_small() {
        assert!(IconAsset::Builtin(BuiltinIcon::Cat).resolve(2).is_err());
        assert!(IconAsset::Builtin(BuiltinIcon::Cat).resolve(MIN_ICON_SIZE).is_ok());
    }

    #[test]
    fn test_missing_file_icon() {
        let icon = IconAsset::File(PathBuf::from("/definitely/not/here.png"));
        assert!(!icon.is_resolvable());
        assert!(icon.resolve(32).is_err());
    }

    #[test]
    fn test_file_icon_resized() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("badge.png");
        RgbaImage::from_pixel(10, 20, Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let img = IconAsset::File(path).resolve(16).unwrap();
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let catalog = TemplateCatalog::default();
        assert_eq!(catalog.items_for("Nope"), catalog.items_for("Popular"));
        assert_eq!(catalog.items_for("Mood").len(), 2);
        assert_eq!(catalog.sections(), vec!["Popular", "Animals", "Mood"]);
    }

    #[test]
    fn test_select_template_delivers_once() {
        let selector = TemplateSelector::new(TemplateCatalog::default());
        let mut params = selector.select_by_id("1").unwrap();

        let template = params.take_selected_template().unwrap();
        assert_eq!(template.name, "Dog");
        assert!(params.take_selected_template().is_none());
    }

    #[test]
    fn test_select_rejects_unresolvable_icon() {
        let selector = TemplateSelector::new(TemplateCatalog::default());
        let broken = Template::new("9", "Ghost", IconAsset::File(PathBuf::from("missing.png")));
        assert!(selector.select_template(&broken).is_err());
        assert!(selector.select_by_id("404").is_err());
    }

    #[test]
    fn test_catalog_from_file() {
        let temp_dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]))
            .save(temp_dir.path().join("hat.png"))
            .unwrap();
        std::fs::write(
            temp_dir.path().join("templates.toml"),
            r#"
default_category = "Fun"

[[categories]]
name = "Fun"

[[categories.templates]]
id = "hat"
name = "Hat"
icon = { file = "hat.png" }

[[categories.templates]]
id = "star"
name = "Star"
icon = { builtin = "star" }
"#,
        )
        .unwrap();

        let catalog = TemplateCatalog::load_or_default(temp_dir.path()).unwrap();
        let hat = catalog.find("hat").unwrap();
        assert_eq!(hat.icon, IconAsset::File(temp_dir.path().join("hat.png")));
        assert!(hat.icon.is_resolvable());
        assert_eq!(catalog.items_for("Other").len(), 2);
    }

    #[test]
    fn test_catalog_rejects_missing_default_category() {
        let catalog = TemplateCatalog {
            default_category: "Missing".to_string(),
            categories: vec![],
        };
        assert!(catalog.validate().is_err());
    }
}

use anyhow::Result;
use log::info;
use std::sync::Arc;

use overlay_cam::camera::{CameraBinding, PreviewSurface, TestPatternProvider};
use overlay_cam::compositor::FrameCompositor;
use overlay_cam::gallery::{AlbumDirectory, FileExport, GalleryWriter, MediaLibrary, ShareExporter};
use overlay_cam::lifecycle::AppLifecycle;
use overlay_cam::permission::{PermissionGate, StaticPermissions};
use overlay_cam::session::{SessionContext, UserSession};
use overlay_cam::{CaptureEngine, CaptureScreen, Config, TemplateCatalog, TemplateSelector};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("📸 Starting overlay camera (desktop driver)");

    // Usage: overlay-cam [template-id] [overlay-taps]
    let mut args = std::env::args().skip(1);
    let template_id = args.next();
    let taps: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(0);

    let config = Config::load()?;
    config.create_directories()?;
    info!(
        "Configuration loaded: {:?}, {}x{} camera",
        config.platform, config.camera.width, config.camera.height
    );

    let sessions = SessionContext::new();
    let user = sessions.sign_in(UserSession {
        user_id: "local".to_string(),
        display_name: whoami(),
        id_token: String::new(),
    })
    .await;
    info!("Capturing as {}", user.display_name);

    // Platform services
    let preview = PreviewSurface::new();
    let provider = Arc::new(TestPatternProvider::new(
        config.camera.devices.clone(),
        (config.camera.width, config.camera.height),
        config.camera.quality,
        &config.paths.temp_dir,
        preview.clone(),
    ));
    let compositor = Arc::new(FrameCompositor::new(
        preview,
        config.overlay.icon_size,
        config.overlay.margin,
        config.camera.quality,
        &config.paths.temp_dir,
    ));
    let gate = Arc::new(PermissionGate::new(
        Arc::new(StaticPermissions::new(config.permissions.camera, config.permissions.storage)),
        config.platform,
    ));
    let library: Option<Arc<dyn MediaLibrary>> = config
        .gallery
        .library_available
        .then(|| Arc::new(AlbumDirectory::new(&config.paths.library_dir)) as Arc<dyn MediaLibrary>);
    let exporter: Option<Arc<dyn ShareExporter>> = config
        .gallery
        .export_enabled
        .then(|| Arc::new(FileExport::new(&config.paths.export_dir)) as Arc<dyn ShareExporter>);

    let engine = Arc::new(CaptureEngine::new(
        CameraBinding::new(provider, config.camera.default_facing),
        compositor,
        gate.clone(),
        config.photo_options(),
    ));
    let mut screen = CaptureScreen::new(
        engine,
        GalleryWriter::new(library, exporter, config.gallery.album.clone()),
        gate,
        config.overlay.default_position,
    );

    let lifecycle = AppLifecycle::new();
    if let Some(feedback) = screen.mount(&lifecycle).await {
        println!("{}", feedback.message());
        sessions.sign_out().await;
        return Ok(());
    }

    if let Some(id) = template_id {
        let selector = TemplateSelector::new(TemplateCatalog::load_or_default(&config.paths.templates_dir)?);
        let mut params = selector.select_by_id(&id)?;
        screen.on_focus(&mut params);
    }
    for _ in 0..taps {
        let position = screen.cycle_overlay();
        info!("Overlay moved to {}", position);
    }

    let feedback = screen.press_capture().await;
    println!("{}", feedback.message());

    screen.unmount().await;
    sessions.sign_out().await;
    info!("Application shut down gracefully");
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "desktop user".to_string())
}

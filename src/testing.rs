//! Scripted stand-ins for the platform collaborators, used by the unit tests.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::{CameraDescriptor, CameraDevice, CameraFacing, CameraProvider, PhotoFile, PhotoOptions};
use crate::compositor::{OverlayScene, ViewCompositor};
use crate::gallery::{ExportRequest, MediaLibrary, SaveOptions, ShareExporter};
use crate::permission::{PermissionBackend, PermissionId, PermissionStatus};

pub struct ScriptedPermissions {
    statuses: Mutex<HashMap<PermissionId, Option<PermissionStatus>>>,
    checks: Mutex<HashMap<PermissionId, usize>>,
    requests: Mutex<HashMap<PermissionId, usize>>,
}

impl ScriptedPermissions {
    pub fn granted() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            checks: Mutex::new(HashMap::new()),
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, id: PermissionId, status: PermissionStatus) {
        self.statuses.lock().unwrap().insert(id, Some(status));
    }

    /// Makes the OS call for `id` error out
    pub fn fail(&self, id: PermissionId) {
        self.statuses.lock().unwrap().insert(id, None);
    }

    pub fn checks(&self, id: PermissionId) -> usize {
        self.checks.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn requests(&self, id: PermissionId) -> usize {
        self.requests.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.checks.lock().unwrap().values().sum::<usize>() + self.requests.lock().unwrap().values().sum::<usize>()
    }

    fn answer(&self, id: PermissionId) -> Result<PermissionStatus> {
        match self.statuses.lock().unwrap().get(&id) {
            Some(Some(status)) => Ok(*status),
            Some(None) => Err(anyhow!("permission service crashed")),
            None => Ok(PermissionStatus::Granted),
        }
    }
}

#[async_trait::async_trait]
impl PermissionBackend for ScriptedPermissions {
    async fn check(&self, id: PermissionId) -> Result<PermissionStatus> {
        *self.checks.lock().unwrap().entry(id).or_insert(0) += 1;
        self.answer(id)
    }

    async fn request(&self, id: PermissionId) -> Result<PermissionStatus> {
        *self.requests.lock().unwrap().entry(id).or_insert(0) += 1;
        self.answer(id)
    }
}

#[derive(Default)]
struct CameraScript {
    photo: Mutex<Option<Result<PathBuf, String>>>,
    photo_calls: AtomicUsize,
    opens: AtomicUsize,
}

/// Back and front cameras whose photos always land at the scripted path
pub struct ScriptedCameraProvider {
    script: Arc<CameraScript>,
}

impl ScriptedCameraProvider {
    pub fn new<P: AsRef<Path>>(photo_path: P) -> Self {
        let script = CameraScript::default();
        *script.photo.lock().unwrap() = Some(Ok(photo_path.as_ref().to_path_buf()));
        Self {
            script: Arc::new(script),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.script.photo.lock().unwrap() = Some(Err(message.to_string()));
    }

    pub fn photo_calls(&self) -> usize {
        self.script.photo_calls.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.script.opens.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CameraProvider for ScriptedCameraProvider {
    fn devices(&self) -> Vec<CameraDescriptor> {
        vec![
            CameraDescriptor { id: "back".to_string(), facing: CameraFacing::Back },
            CameraDescriptor { id: "front".to_string(), facing: CameraFacing::Front },
        ]
    }

    async fn open(&self, device: &CameraDescriptor) -> Result<Box<dyn CameraDevice>> {
        self.script.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCamera {
            descriptor: device.clone(),
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedCamera {
    descriptor: CameraDescriptor,
    script: Arc<CameraScript>,
}

#[async_trait::async_trait]
impl CameraDevice for ScriptedCamera {
    fn descriptor(&self) -> &CameraDescriptor {
        &self.descriptor
    }

    async fn take_photo(&self, _options: &PhotoOptions) -> Result<PhotoFile> {
        self.script.photo_calls.fetch_add(1, Ordering::SeqCst);
        // a real shutter suspends; give concurrent taps a chance to run
        tokio::task::yield_now().await;
        let scripted = self.script.photo.lock().unwrap().clone();
        match scripted {
            Some(Ok(path)) => Ok(PhotoFile { path }),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no photo scripted")),
        }
    }
}

pub struct ScriptedCompositor {
    result: Mutex<Result<PathBuf, String>>,
    calls: AtomicUsize,
    last_scene: Mutex<Option<OverlayScene>>,
}

impl ScriptedCompositor {
    pub fn succeeding<P: AsRef<Path>>(path: P) -> Self {
        Self {
            result: Mutex::new(Ok(path.as_ref().to_path_buf())),
            calls: AtomicUsize::new(0),
            last_scene: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.result.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_scene(&self) -> Option<OverlayScene> {
        self.last_scene.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ViewCompositor for ScriptedCompositor {
    async fn capture_view(&self, scene: &OverlayScene) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_scene.lock().unwrap() = Some(scene.clone());
        let result = self.result.lock().unwrap().clone();
        result.map_err(|message| anyhow!(message))
    }
}

pub struct ScriptedLibrary {
    fail: bool,
    calls: AtomicUsize,
    last_album: Mutex<Option<String>>,
}

impl ScriptedLibrary {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_album: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_album(&self) -> Option<String> {
        self.last_album.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaLibrary for ScriptedLibrary {
    async fn save(&self, path: &Path, options: &SaveOptions) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_album.lock().unwrap() = Some(options.album.clone());
        if self.fail {
            return Err(anyhow!("media store rejected the write"));
        }
        Ok(PathBuf::from("/gallery").join(&options.album).join(path.file_name().unwrap_or_default()))
    }
}

pub struct ScriptedExporter {
    fail: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<ExportRequest>>,
}

impl ScriptedExporter {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ExportRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ShareExporter for ScriptedExporter {
    async fn export(&self, path: &Path, request: &ExportRequest) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail {
            return Err(anyhow!("share module missing"));
        }
        Ok(PathBuf::from("/downloads").join(path.file_name().unwrap_or_default()))
    }
}

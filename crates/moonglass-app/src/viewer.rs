//! The interactive window: an eframe app that spins the sphere.
//!
//! The sphere is drawn from an egui paint callback, which runs on the UI
//! thread with the glow context current. Construction is polled once per
//! frame, so a slow texture download never blocks the window.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use eframe::{egui, egui_glow, glow};
use egui::mutex::Mutex;
use moonglass_config::Config;
use moonglass_render::{RenderParameters, SceneMatrices, Sphere, SphereState};
use tracing::{debug, error, info, warn};

use crate::animation::AnimationClock;
use crate::scene::{self, Scene};

/// How often `config.ron` is checked for edits.
const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("the glow renderer did not provide an OpenGL context")]
    NoGlContext,
}

enum Stage {
    Loading(SphereState<glow::Context>),
    Ready(Arc<Mutex<Sphere<glow::Context>>>),
    Failed(String),
    Closed,
}

/// What a reloaded config means for the running viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReloadPlan {
    /// Already seen and rejected.
    Unchanged,
    /// Invalid; the running config stays in effect.
    Rejected,
    Apply { reload_texture: bool },
}

/// The running config and the most recent invalid edit of it.
///
/// An invalid edit never replaces the running config, so a later fix is
/// compared against what is actually on screen.
#[derive(Debug)]
struct ConfigTracker {
    active: Config,
    rejected: Option<Config>,
}

impl ConfigTracker {
    fn new(active: Config) -> Self {
        Self {
            active,
            rejected: None,
        }
    }

    fn offer(&mut self, candidate: Config) -> ReloadPlan {
        if self.rejected.as_ref() == Some(&candidate) {
            return ReloadPlan::Unchanged;
        }
        if let Err(err) = candidate.validate() {
            warn!("Ignoring reloaded config: {err}");
            self.rejected = Some(candidate);
            return ReloadPlan::Rejected;
        }

        self.rejected = None;
        let reload_texture = texture_changed(&self.active, &candidate);
        self.active = candidate;
        ReloadPlan::Apply { reload_texture }
    }

    /// The file is back to the running config.
    fn reverted(&mut self) {
        self.rejected = None;
    }
}

pub struct Viewer {
    gl: Arc<glow::Context>,
    config: ConfigTracker,
    config_dir: PathBuf,
    scene: Scene,
    clock: AnimationClock,
    stage: Stage,
    frame_errors: Arc<AtomicU64>,
    last_reload_check: Instant,
}

impl Viewer {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        config_dir: PathBuf,
    ) -> Result<Self, ViewerError> {
        let gl = cc.gl.clone().ok_or(ViewerError::NoGlContext)?;
        let scene = Scene::from_config(&config);
        info!(
            "Sun elevation at the sub-camera point: {:.1} degrees",
            scene::sun_elevation_deg(&scene)
        );

        let stage = Stage::Loading(start_loading(&gl, &config));
        Ok(Self {
            gl,
            clock: AnimationClock::new(config.sphere.rotation_speed_deg),
            config: ConfigTracker::new(config),
            config_dir,
            scene,
            stage,
            frame_errors: Arc::new(AtomicU64::new(0)),
            last_reload_check: Instant::now(),
        })
    }

    fn poll_loading(&mut self) {
        if !matches!(self.stage, Stage::Loading(_)) {
            return;
        }
        let Stage::Loading(state) = std::mem::replace(&mut self.stage, Stage::Closed) else {
            return;
        };

        self.stage = match state.advance() {
            Ok(SphereState::Ready(sphere)) => {
                info!("Sphere ready ({:?})", sphere.texture());
                self.frame_errors.store(0, Ordering::Relaxed);
                Stage::Ready(Arc::new(Mutex::new(sphere)))
            }
            Ok(pending) => Stage::Loading(pending),
            Err(err) => {
                error!("Sphere initialization failed: {err}");
                Stage::Failed(err.to_string())
            }
        };
    }

    fn check_config(&mut self) {
        if self.last_reload_check.elapsed() < RELOAD_INTERVAL {
            return;
        }
        self.last_reload_check = Instant::now();

        match self.config.active.reload(&self.config_dir) {
            Ok(Some(config)) => self.apply_config(config),
            Ok(None) => self.config.reverted(),
            // The file may be mid-write; try again next interval.
            Err(err) => debug!("Config reload skipped: {err}"),
        }
    }

    fn apply_config(&mut self, config: Config) {
        let ReloadPlan::Apply { reload_texture } = self.config.offer(config) else {
            return;
        };

        let config = &self.config.active;
        let aspect_ratio = self.scene.camera.aspect_ratio;
        self.scene = Scene::from_config(config);
        self.scene.camera.aspect_ratio = aspect_ratio;
        self.clock.set_speed(config.sphere.rotation_speed_deg);

        if reload_texture {
            info!(
                "Texture settings changed, reloading '{}'",
                config.sphere.texture.as_deref().unwrap_or("grid")
            );
            self.stage = Stage::Loading(start_loading(&self.gl, config));
        }
    }
}

fn start_loading(gl: &Arc<glow::Context>, config: &Config) -> SphereState<glow::Context> {
    Sphere::create(
        Arc::clone(gl),
        scene::texture_source(&config.sphere),
        scene::texture_mode(&config.sphere),
    )
    .into()
}

/// Whether a config change needs a new texture.
fn texture_changed(old: &Config, new: &Config) -> bool {
    old.sphere.texture != new.sphere.texture
        || old.sphere.non_power_of_two != new.sphere.non_power_of_two
}

fn sphere_callback(
    rect: egui::Rect,
    sphere: Arc<Mutex<Sphere<glow::Context>>>,
    params: RenderParameters,
    matrices: SceneMatrices,
    frame_errors: Arc<AtomicU64>,
    log_every_error: bool,
) -> egui::PaintCallback {
    egui::PaintCallback {
        rect,
        callback: Arc::new(egui_glow::CallbackFn::new(move |_info, _painter| {
            if let Err(err) = sphere.lock().render(&params, &matrices) {
                let previous = frame_errors.fetch_add(1, Ordering::Relaxed);
                if log_every_error || previous == 0 {
                    warn!("Sphere frame failed: {err}");
                }
            }
        })),
    }
}

fn status_text(ui: &egui::Ui, rect: egui::Rect, text: &str, color: egui::Color32) {
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(18.0),
        color,
    );
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_config();
        self.poll_loading();
        let angle = self.clock.tick();

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let (rect, _response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
                self.scene.resize(rect.width(), rect.height());

                match &self.stage {
                    Stage::Ready(sphere) => {
                        ui.painter().add(sphere_callback(
                            rect,
                            Arc::clone(sphere),
                            self.scene.params,
                            self.scene.matrices(angle),
                            Arc::clone(&self.frame_errors),
                            self.config.active.debug.log_frame_errors,
                        ));
                    }
                    Stage::Loading(_) => {
                        status_text(ui, rect, "Loading texture...", egui::Color32::GRAY);
                    }
                    Stage::Failed(message) => {
                        status_text(ui, rect, message, egui::Color32::LIGHT_RED);
                    }
                    Stage::Closed => {}
                }
            });

        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        let failed = self.frame_errors.load(Ordering::Relaxed);
        info!(
            frames = self.clock.frame_count(),
            failed_frames = failed,
            "Viewer closing"
        );
        // Release GL objects while the context is still alive.
        self.stage = Stage::Closed;
    }
}

/// Open the window and run until it is closed.
pub fn run(config: Config, config_dir: PathBuf) -> eframe::Result<()> {
    let window = &config.window;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([window.width as f32, window.height as f32])
            .with_title(window.title.clone())
            .with_fullscreen(window.fullscreen),
        vsync: window.vsync,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    let title = window.title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(Viewer::new(cc, config, config_dir)?))),
    )
}

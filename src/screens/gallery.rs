use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};

use eframe::egui;

use crate::services::config_loader::FozlavaConfig;
use crate::services::photo_cache::{GalleryEvent, photo_cache_root, spawn_gallery_decode};

const GALLERY_MAX_DIMENSION: u32 = 1024;
const TILE_WIDTH: f32 = 300.0;

#[derive(Default)]
struct GalleryUiState {
    decode_started: bool,
    receiver: Option<Receiver<GalleryEvent>>,
    total: usize,
    completed: usize,
    photos: Vec<(String, Option<egui::TextureHandle>)>,
    error: Option<String>,
}

static GALLERY_STATE: OnceLock<Mutex<GalleryUiState>> = OnceLock::new();

fn gallery_state() -> &'static Mutex<GalleryUiState> {
    GALLERY_STATE.get_or_init(|| Mutex::new(GalleryUiState::default()))
}

pub fn reset() {
    let mut state = gallery_state().lock().expect("gallery state lock poisoned");
    *state = GalleryUiState::default();
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) {
    let mut guard = gallery_state().lock().expect("gallery state lock poisoned");
    let state = &mut *guard;

    if !state.decode_started {
        state.decode_started = true;
        state.receiver = Some(spawn_gallery_decode(
            PathBuf::from(&config.gallery_dir),
            photo_cache_root(std::path::Path::new(&config.cache_dir)),
            GALLERY_MAX_DIMENSION,
        ));
    }

    drain_decode(ui.ctx(), state);

    if state.receiver.is_some() {
        ui.ctx().request_repaint();
    }

    ui.vertical_centered(|ui| {
        ui.heading("Event Gallery");
    });
    ui.add_space(10.0);

    if let Some(message) = &state.error {
        ui.colored_label(egui::Color32::LIGHT_RED, message);
        if ui.button("Retry").clicked() {
            reset_in_place(state);
        }
        return;
    }

    if state.receiver.is_some() {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label(format!("Loading photos {}/{}...", state.completed, state.total));
        });
        ui.add_space(8.0);
    } else if state.total == 0 {
        ui.label(format!(
            "No photos found in \"{}\".",
            config.gallery_dir
        ));
        return;
    }

    let columns = (ui.available_width() / (TILE_WIDTH + 16.0)).floor().max(1.0) as usize;

    egui::ScrollArea::vertical()
        .id_salt("gallery_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            egui::Grid::new("gallery_grid")
                .num_columns(columns)
                .spacing([16.0, 16.0])
                .show(ui, |ui| {
                    for (index, (name, texture)) in state.photos.iter().enumerate() {
                        match texture {
                            Some(texture) => {
                                let size = texture.size_vec2();
                                let scale = (TILE_WIDTH / size.x).min(1.0);
                                ui.add(
                                    egui::Image::from_texture(texture)
                                        .fit_to_exact_size(size * scale),
                                )
                                .on_hover_text(name);
                            }
                            None => {
                                ui.colored_label(
                                    egui::Color32::GRAY,
                                    format!("couldn't decode {name}"),
                                );
                            }
                        }
                        if (index + 1) % columns == 0 {
                            ui.end_row();
                        }
                    }
                });
        });
}

fn reset_in_place(state: &mut GalleryUiState) {
    *state = GalleryUiState::default();
}

fn drain_decode(ctx: &egui::Context, state: &mut GalleryUiState) {
    loop {
        let event = {
            let Some(rx) = &state.receiver else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(GalleryEvent::Started { total }) => {
                state.total = total;
            }
            Ok(GalleryEvent::Decoded { path, photo }) => {
                state.completed += 1;
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                let texture = photo.map(|photo| {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [photo.width, photo.height],
                        &photo.rgba,
                    );
                    ctx.load_texture(
                        format!("gallery_{name}"),
                        image,
                        egui::TextureOptions::LINEAR,
                    )
                });
                state.photos.push((name, texture));
            }
            Ok(GalleryEvent::Finished { .. }) => {
                state.receiver = None;
                break;
            }
            Ok(GalleryEvent::Failed { message }) => {
                state.error = Some(message);
                state.receiver = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.receiver = None;
                break;
            }
        }
    }
}

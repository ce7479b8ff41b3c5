use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use eframe::egui;

use crate::models::PointsRow;
use crate::services::config_loader::FozlavaConfig;
use crate::services::points_cache::{DiskCache, POINTS_TABLE_KEY};
use crate::services::portal_client::{FetchEvent, spawn_fetch_points};

#[derive(Default)]
struct HomeUiState {
    rows: Vec<PointsRow>,
    cache_checked: bool,
    showing_cached: bool,
    receiver: Option<Receiver<FetchEvent<Vec<PointsRow>>>>,
    last_fetch_at: Option<f64>,
    fetch_error: Option<String>,
}

static HOME_STATE: OnceLock<Mutex<HomeUiState>> = OnceLock::new();

fn home_state() -> &'static Mutex<HomeUiState> {
    HOME_STATE.get_or_init(|| Mutex::new(HomeUiState::default()))
}

/// Clear the screen state when navigating away. Dropping the receiver
/// detaches any in-flight fetch and stops the poll with it.
pub fn reset() {
    let mut state = home_state().lock().expect("home state lock poisoned");
    *state = HomeUiState::default();
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) {
    let mut guard = home_state().lock().expect("home state lock poisoned");
    let state = &mut *guard;
    let now = ui.input(|input| input.time);

    // Cached standings render immediately; the network only ever
    // improves on them.
    if !state.cache_checked {
        state.cache_checked = true;
        let cache = DiskCache::new(&config.cache_dir);
        if let Some(rows) = cache.read::<Vec<PointsRow>>(POINTS_TABLE_KEY) {
            state.rows = rows;
            state.showing_cached = true;
        }
    }

    let poll_due = state
        .last_fetch_at
        .is_none_or(|started| now - started >= config.points_poll_seconds as f64);
    if state.receiver.is_none() && poll_due {
        state.last_fetch_at = Some(now);
        state.receiver = Some(spawn_fetch_points(config.endpoints.total_points.clone()));
    }

    loop {
        let event = {
            let Some(rx) = &state.receiver else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(rows)) => {
                let cache = DiskCache::new(&config.cache_dir);
                cache.write(POINTS_TABLE_KEY, &rows);
                state.rows = rows;
                state.showing_cached = false;
                state.fetch_error = None;
                state.receiver = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
                // Stale data stays on screen; the error is a note, not
                // a replacement.
                state.fetch_error = Some(message);
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

    if state.receiver.is_some() {
        ui.ctx().request_repaint();
    } else {
        // Keep frames coming so the poll timer fires without input.
        ui.ctx().request_repaint_after(Duration::from_secs(1));
    }

    egui::ScrollArea::vertical()
        .id_salt("home_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            home_body(ui, state, config);
        });
}

fn home_body(ui: &mut egui::Ui, state: &mut HomeUiState, config: &FozlavaConfig) {
    ui.vertical_centered(|ui| {
        ui.heading("FOZLAVA");
        ui.label("Points Table");
    });
    ui.add_space(12.0);

    if let Some(message) = &state.fetch_error {
        let mut retry = false;
        ui.horizontal(|ui| {
            ui.colored_label(
                egui::Color32::LIGHT_RED,
                format!("Refresh failed: {message}"),
            );
            retry = ui.button("Retry").clicked();
        });
        ui.add_space(6.0);
        if retry {
            state.fetch_error = None;
            state.last_fetch_at = None;
        }
    } else if state.showing_cached {
        ui.colored_label(egui::Color32::GRAY, "Showing cached standings...");
        ui.add_space(6.0);
    }

    if state.rows.is_empty() {
        if state.receiver.is_some() {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label("Loading points table...");
            });
        } else {
            ui.label("No standings available yet.");
        }
    } else {
        egui::Grid::new("points_table")
            .num_columns(3)
            .spacing([24.0, 8.0])
            .striped(true)
            .show(ui, |ui| {
                ui.label(egui::RichText::new("Rank").strong());
                ui.label(egui::RichText::new("Team").strong());
                ui.label(egui::RichText::new("Points").strong());
                ui.end_row();

                for (rank, row) in state.rows.iter().enumerate() {
                    ui.label(format!("{}", rank + 1));
                    ui.label(&row.team);
                    ui.label(row.points_label());
                    ui.end_row();
                }
            });
    }

    ui.add_space(20.0);
    ui.heading("Team Departments");
    ui.add_space(6.0);
    for team in &config.teams {
        egui::CollapsingHeader::new(&team.name)
            .id_salt(&team.name)
            .show(ui, |ui| {
                for department in &team.departments {
                    ui.label(department);
                }
            });
    }
}

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};

use eframe::egui;

use crate::models::EventStatus;
use crate::services::config_loader::FozlavaConfig;
use crate::services::portal_client::{
    FetchEvent, spawn_fetch_event_statuses, spawn_save_event_statuses,
};

#[derive(Default)]
struct AdminUiState {
    fetch_started: bool,
    receiver: Option<Receiver<FetchEvent<Vec<EventStatus>>>>,
    statuses: Vec<EventStatus>,
    loaded: bool,
    error: Option<String>,
    save_rx: Option<Receiver<FetchEvent<()>>>,
    saving: bool,
    save_note: Option<String>,
    save_error: Option<String>,
}

static ADMIN_STATE: OnceLock<Mutex<AdminUiState>> = OnceLock::new();

fn admin_state() -> &'static Mutex<AdminUiState> {
    ADMIN_STATE.get_or_init(|| Mutex::new(AdminUiState::default()))
}

pub fn reset() {
    let mut state = admin_state().lock().expect("admin state lock poisoned");
    *state = AdminUiState::default();
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) {
    let mut guard = admin_state().lock().expect("admin state lock poisoned");
    let state = &mut *guard;

    if !state.fetch_started {
        state.fetch_started = true;
        state.receiver = Some(spawn_fetch_event_statuses(
            config.endpoints.event_status.clone(),
        ));
    }

    drain_statuses(state);
    drain_save(state);

    if state.receiver.is_some() || state.save_rx.is_some() {
        ui.ctx().request_repaint();
    }

    ui.vertical_centered(|ui| {
        ui.heading("Manage Event Registration Status");
    });
    ui.add_space(10.0);

    if let Some(message) = &state.error {
        ui.colored_label(egui::Color32::LIGHT_RED, message);
        if ui.button("Retry").clicked() {
            state.error = None;
            state.fetch_started = false;
            state.loaded = false;
        }
        return;
    }

    if !state.loaded {
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Loading events...");
        });
        return;
    }

    if state.statuses.is_empty() {
        ui.label("No events on the status sheet.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("admin_status_scroll")
        .auto_shrink([false, false])
        .max_height(ui.available_height() - 60.0)
        .show(ui, |ui| {
            for status in &mut state.statuses {
                ui.horizontal(|ui| {
                    let mut open = status.is_open();
                    if ui.checkbox(&mut open, &status.event).changed() {
                        status.set_open(open);
                        state.save_note = None;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let (text, color) = if status.is_open() {
                            ("open", egui::Color32::LIGHT_GREEN)
                        } else {
                            ("closed", egui::Color32::GRAY)
                        };
                        ui.colored_label(color, text);
                    });
                });
                ui.separator();
            }
        });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui
            .add_enabled(!state.saving, egui::Button::new("Save changes"))
            .clicked()
        {
            state.save_error = None;
            state.save_note = None;
            state.save_rx = Some(spawn_save_event_statuses(
                config.endpoints.event_status.clone(),
                state.statuses.clone(),
            ));
        }
        if state.saving {
            ui.add(egui::Spinner::new());
            ui.label("Saving...");
        }
        if let Some(note) = &state.save_note {
            ui.colored_label(egui::Color32::LIGHT_GREEN, note);
        }
        if let Some(message) = &state.save_error {
            ui.colored_label(egui::Color32::LIGHT_RED, message);
        }
    });
}

fn drain_statuses(state: &mut AdminUiState) {
    loop {
        let event = {
            let Some(rx) = &state.receiver else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {}
            Ok(FetchEvent::Finished(statuses)) => {
                state.statuses = statuses;
                state.loaded = true;
                state.error = None;
                state.receiver = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
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

fn drain_save(state: &mut AdminUiState) {
    loop {
        let event = {
            let Some(rx) = &state.save_rx else {
                break;
            };
            rx.try_recv()
        };
        match event {
            Ok(FetchEvent::Started) => {
                state.saving = true;
            }
            Ok(FetchEvent::Finished(())) => {
                state.saving = false;
                state.save_note = Some("Event statuses updated".to_string());
                state.save_rx = None;
                break;
            }
            Ok(FetchEvent::Failed { message }) => {
                state.saving = false;
                state.save_error = Some(message);
                state.save_rx = None;
                break;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.saving = false;
                state.save_rx = None;
                break;
            }
        }
    }
}

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Mutex, OnceLock};

use eframe::egui;

use crate::models::{EventResult, ResultsDocument, Winner};
use crate::services::config_loader::FozlavaConfig;
use crate::services::portal_client::{FetchEvent, spawn_fetch_results};
use crate::services::result_pipeline::{
    CategoryFilter, aggregate_document, filter_results, sort_for_display,
};
use crate::services::reveal_flow::RevealFlow;

#[derive(Default)]
struct ResultsUiState {
    fetch_started: bool,
    receiver: Option<Receiver<FetchEvent<ResultsDocument>>>,
    results: Vec<EventResult>,
    loaded: bool,
    error: Option<String>,
    search_term: String,
    category: CategoryFilter,
    reveal: Option<RevealFlow>,
}

static RESULTS_STATE: OnceLock<Mutex<ResultsUiState>> = OnceLock::new();

fn results_state() -> &'static Mutex<ResultsUiState> {
    RESULTS_STATE.get_or_init(|| Mutex::new(ResultsUiState::default()))
}

pub fn reset() {
    let mut state = results_state().lock().expect("results state lock poisoned");
    *state = ResultsUiState::default();
}

pub fn ui(ui: &mut egui::Ui, config: &FozlavaConfig) {
    let mut guard = results_state().lock().expect("results state lock poisoned");
    let state = &mut *guard;

    if !state.fetch_started {
        state.fetch_started = true;
        state.receiver = Some(spawn_fetch_results(config.endpoints.results.clone()));
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
            Ok(FetchEvent::Finished(document)) => {
                match aggregate_document(document, config.merge_policy) {
                    Ok(results) => {
                        state.results = results;
                        state.loaded = true;
                        state.error = None;
                    }
                    Err(message) => state.error = Some(message),
                }
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

    if state.receiver.is_some() {
        ui.ctx().request_repaint();
    }

    ui.vertical_centered(|ui| {
        ui.heading("Event Results");
    });
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Search:");
        ui.add_sized(
            [320.0, 26.0],
            egui::TextEdit::singleline(&mut state.search_term)
                .hint_text("Event, participant or team..."),
        );
        ui.separator();
        for category in CategoryFilter::ALL {
            if ui
                .selectable_label(state.category == category, category.label())
                .clicked()
            {
                state.category = category;
            }
        }
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
            ui.label("Loading results...");
        });
        return;
    }

    let reveal = state
        .reveal
        .get_or_insert_with(|| RevealFlow::new(config.results_page_size));
    reveal.sync_filter(&state.search_term, state.category);

    let mut filtered = filter_results(&state.results, &state.search_term, state.category);
    sort_for_display(&mut filtered);

    if filtered.is_empty() {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label("No results found");
            ui.colored_label(egui::Color32::GRAY, "Try adjusting your search criteria");
        });
        return;
    }

    let visible = reveal.visible_count(filtered.len());
    let fully_revealed = reveal.fully_revealed(filtered.len());
    let mut advance = false;

    egui::ScrollArea::vertical()
        .id_salt("results_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for result in &filtered[..visible] {
                result_card(ui, result);
                ui.add_space(10.0);
            }

            // Trailing sentinel: scrolling it into view asks for the
            // next page. Nothing new is fetched, only revealed.
            if !fully_revealed {
                let (rect, _) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), 28.0),
                    egui::Sense::hover(),
                );
                ui.put(rect, egui::Spinner::new());
                if ui.is_rect_visible(rect) {
                    advance = true;
                }
            }
        });

    if advance {
        reveal.advance();
        ui.ctx().request_repaint();
    }
}

fn result_card(ui: &mut egui::Ui, result: &EventResult) {
    egui::Frame::group(ui.style())
        .fill(ui.style().visuals.faint_bg_color)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                let title = if result.item.is_empty() {
                    "(unnamed event)"
                } else {
                    result.item.as_str()
                };
                ui.label(egui::RichText::new(title).strong().size(18.0));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(egui::Color32::GRAY, result.kind.label());
                });
            });
            ui.separator();

            for (place, winners) in result.placements() {
                if winners.iter().all(Winner::is_blank) {
                    continue;
                }
                ui.horizontal_top(|ui| {
                    ui.label(egui::RichText::new(place).strong());
                    ui.vertical(|ui| {
                        for winner in winners {
                            if winner.is_blank() {
                                continue;
                            }
                            winner_line(ui, winner);
                        }
                    });
                });
            }
        });
}

fn winner_line(ui: &mut egui::Ui, winner: &Winner) {
    match winner {
        Winner::Group(name) => {
            ui.label(name);
        }
        Winner::Individual {
            name,
            department,
            year,
            group,
        } => {
            ui.label(name);
            let detail: Vec<&str> = [department.as_deref(), year.as_deref(), group.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect();
            if !detail.is_empty() {
                ui.colored_label(egui::Color32::GRAY, detail.join(", "));
            }
        }
        Winner::Other(value) => {
            // A row the sheet got wrong; show it raw rather than hide a
            // winner.
            ui.colored_label(egui::Color32::GRAY, value.to_string());
        }
    }
}

use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::models::{
    EventStatus, PointsDocument, PointsRow, RegistrationForm, RegistrationRecord, ResultsDocument,
    ScheduledEvent, SubmitResponse,
};
use crate::services::registration;

/// Lifecycle of one background fetch, drained with `try_recv` from the
/// owning screen each frame. Dropping the receiver detaches the worker:
/// its next send fails and the thread exits.
pub enum FetchEvent<T> {
    Started,
    Finished(T),
    Failed { message: String },
}

fn spawn_fetch<T, Fut>(
    label: &'static str,
    make_future: impl FnOnce() -> Fut + Send + 'static,
) -> Receiver<FetchEvent<T>>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + 'static,
{
    let (tx, rx) = mpsc::channel::<FetchEvent<T>>();

    thread::spawn(move || {
        let _ = tx.send(FetchEvent::Started);

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = tx.send(FetchEvent::Failed {
                    message: format!("failed to initialize fetch runtime: {err}"),
                });
                return;
            }
        };

        match runtime.block_on(make_future()) {
            Ok(value) => {
                info!("{label} finished");
                let _ = tx.send(FetchEvent::Finished(value));
            }
            Err(err) => {
                error!("{label} failed: {err:#}");
                let _ = tx.send(FetchEvent::Failed {
                    message: format!("{err:#}"),
                });
            }
        }
    });

    rx
}

async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    let response = reqwest::get(url)
        .await
        .context("request failed")?
        .error_for_status()
        .context("server returned an error status")?;
    response.json::<T>().await.context("unexpected response shape")
}

pub fn spawn_fetch_results(url: String) -> Receiver<FetchEvent<ResultsDocument>> {
    spawn_fetch("results fetch", move || async move {
        get_json::<ResultsDocument>(&url).await
    })
}

/// Points standings, already sorted descending.
pub fn spawn_fetch_points(url: String) -> Receiver<FetchEvent<Vec<PointsRow>>> {
    spawn_fetch("points fetch", move || async move {
        let document = get_json::<PointsDocument>(&url).await?;
        Ok(document.sorted_rows())
    })
}

pub fn spawn_fetch_schedule(url: String) -> Receiver<FetchEvent<Vec<ScheduledEvent>>> {
    spawn_fetch("schedule fetch", move || async move {
        get_json::<Vec<ScheduledEvent>>(&url).await
    })
}

/// Registrations, optionally server-filtered to one event via
/// `?event=<name>`.
pub fn spawn_fetch_registrations(
    url: String,
    event: Option<String>,
) -> Receiver<FetchEvent<Vec<RegistrationRecord>>> {
    spawn_fetch("registrations fetch", move || async move {
        let client = reqwest::Client::new();
        let mut request = client.get(&url);
        if let Some(event) = &event {
            request = request.query(&[("event", event.as_str())]);
        }
        let response = request
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("server returned an error status")?;
        response
            .json::<Vec<RegistrationRecord>>()
            .await
            .context("unexpected response shape")
    })
}

pub fn spawn_fetch_event_statuses(url: String) -> Receiver<FetchEvent<Vec<EventStatus>>> {
    spawn_fetch("event status fetch", move || async move {
        get_json::<Vec<EventStatus>>(&url).await
    })
}

/// Persist the full toggle sheet; the endpoint replaces, not patches.
pub fn spawn_save_event_statuses(
    url: String,
    statuses: Vec<EventStatus>,
) -> Receiver<FetchEvent<()>> {
    spawn_fetch("event status save", move || async move {
        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .json(&statuses)
            .send()
            .await
            .context("request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("save rejected with {status}: {body}");
        }
        Ok(())
    })
}

pub enum SubmitEvent {
    Started,
    /// The advisory duplicate guard found a matching registration; the
    /// previously issued number is echoed instead of submitting again.
    AlreadyRegistered { reg_num: String },
    Submitted { reg_num: String },
    Failed { message: String },
}

enum SubmitOutcome {
    Duplicate(String),
    Accepted(String),
}

pub fn spawn_submit_registration(
    registrations_url: String,
    form: RegistrationForm,
) -> Receiver<SubmitEvent> {
    let (tx, rx) = mpsc::channel::<SubmitEvent>();

    thread::spawn(move || {
        let _ = tx.send(SubmitEvent::Started);

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = tx.send(SubmitEvent::Failed {
                    message: format!("failed to initialize submit runtime: {err}"),
                });
                return;
            }
        };

        let outcome = runtime.block_on(async {
            // Best-effort duplicate check; if the listing is unavailable
            // the submission still goes through.
            match get_json::<Vec<RegistrationRecord>>(&registrations_url).await {
                Ok(records) => {
                    if let Some(existing) =
                        registration::find_existing_registration(&records, &form)
                    {
                        info!(
                            "Registration for {} already exists as {}",
                            form.name, existing.reg_num
                        );
                        return Ok(SubmitOutcome::Duplicate(existing.reg_num.clone()));
                    }
                }
                Err(err) => warn!("duplicate check skipped: {err:#}"),
            }

            let client = reqwest::Client::new();
            let response = client
                .post(&registrations_url)
                .form(&registration::form_fields(&form))
                .send()
                .await
                .context("request failed")?
                .error_for_status()
                .context("server returned an error status")?;
            let body: SubmitResponse = response
                .json()
                .await
                .context("unexpected response shape")?;
            if !body.is_success() {
                bail!("server rejected the registration: {}", body.status);
            }
            Ok(SubmitOutcome::Accepted(body.reg_num))
        });

        let event = match outcome {
            Ok(SubmitOutcome::Duplicate(reg_num)) => SubmitEvent::AlreadyRegistered { reg_num },
            Ok(SubmitOutcome::Accepted(reg_num)) => SubmitEvent::Submitted { reg_num },
            Err(err) => {
                error!("registration submit failed: {err:#}");
                SubmitEvent::Failed {
                    message: format!("{err:#}"),
                }
            }
        };
        let _ = tx.send(event);
    });

    rx
}

//! Background tasks for the backend conversation flow.
//!
//! Each user action spawns at most one task. Tasks report progress through
//! the shared event queue; failures are logged and reported as events so the
//! UI can clear its busy state, but they never surface as user-visible
//! errors.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::backend::BackendClient;
use crate::design::GeneratedImage;
use crate::tui::AppEvent;

/// Progress reported by the background tasks.
#[derive(Debug)]
pub enum SessionEvent {
    /// `/start` returned a user id.
    Started { user_id: String },
    /// A follow-up question arrived for the latest answer.
    FollowUp { question: String },
    /// The follow-up request failed; the interview stays where it was.
    FollowUpFailed,
    /// The AI design answer arrived; the prompt and image stages follow.
    Answer { answer: String },
    /// The text-to-image prompt arrived.
    Prompt { prompt: String },
    /// The generated image decoded successfully.
    Image(GeneratedImage),
    /// The generation chain stopped early. Stages that completed have
    /// already been delivered as their own events.
    GenerationFailed,
}

fn send(tx: &UnboundedSender<AppEvent>, event: SessionEvent) {
    // The receiver only goes away on shutdown.
    let _ = tx.send(AppEvent::Session(event));
}

/// Fetch the session id in the background. The input stays usable while
/// this runs; if it fails, later requests carry a null user id.
pub fn spawn_start(client: BackendClient, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        match client.start().await {
            Ok(user_id) => {
                info!(%user_id, "session started");
                send(&tx, SessionEvent::Started { user_id });
            }
            Err(err) => error!("failed to start session: {err:#}"),
        }
    });
}

/// Send an interview answer and wait for the next follow-up question.
pub fn spawn_follow_up(
    client: BackendClient,
    tx: UnboundedSender<AppEvent>,
    user_id: Option<String>,
    answer: String,
) {
    tokio::spawn(async move {
        match client.process(user_id.as_deref(), &answer).await {
            Ok(question) => send(&tx, SessionEvent::FollowUp { question }),
            Err(err) => {
                error!("follow-up request failed: {err:#}");
                send(&tx, SessionEvent::FollowUpFailed);
            }
        }
    });
}

/// Run the generation chain: AI answer, then the text-to-image prompt, then
/// the image itself. Stages report individually so the UI updates as each
/// result lands; a failure stops the chain at that stage.
pub fn spawn_generation(
    client: BackendClient,
    tx: UnboundedSender<AppEvent>,
    user_id: Option<String>,
    answer: String,
) {
    tokio::spawn(async move {
        let ai_answer = match client.ai_answer(user_id.as_deref(), &answer).await {
            Ok(ai_answer) => ai_answer,
            Err(err) => {
                error!("ai_answer request failed: {err:#}");
                send(&tx, SessionEvent::GenerationFailed);
                return;
            }
        };
        send(
            &tx,
            SessionEvent::Answer {
                answer: ai_answer.clone(),
            },
        );

        let prompt = match client.t2i_prompt(user_id.as_deref(), &ai_answer).await {
            Ok(prompt) => prompt,
            Err(err) => {
                error!("prompt generation failed: {err:#}");
                send(&tx, SessionEvent::GenerationFailed);
                return;
            }
        };
        send(
            &tx,
            SessionEvent::Prompt {
                prompt: prompt.clone(),
            },
        );

        let image = match client.generate_image(&prompt).await {
            Ok(base64_str) => GeneratedImage::from_base64(&base64_str),
            Err(err) => {
                error!("image generation failed: {err:#}");
                send(&tx, SessionEvent::GenerationFailed);
                return;
            }
        };
        match image {
            Ok(image) => {
                info!(width = image.width(), height = image.height(), "image received");
                send(&tx, SessionEvent::Image(image));
            }
            Err(err) => {
                error!("image payload rejected: {err:#}");
                send(&tx, SessionEvent::GenerationFailed);
            }
        }
    });
}

use std::path::PathBuf;

use image::RgbImage;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::BackendClient;
use crate::conversation::{Sender, Transcript, MAX_FOLLOW_UP_QUESTIONS};
use crate::design::GeneratedImage;
use crate::session::{self, SessionEvent};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting the description and the follow-up answers.
    Interview,
    /// The final answer was submitted; the generation chain is running.
    Generating,
    /// The text-to-image prompt arrived; the design panel is showing.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Downscaled preview pixels cached per panel size.
pub struct PreviewCache {
    pub cols: u16,
    pub rows: u16,
    pub pixels: RgbImage,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub phase: Phase,
    pub input_mode: InputMode,

    // Conversation state
    pub transcript: Transcript,
    pub follow_up_count: usize,
    pub user_id: Option<String>,
    pub pending: bool, // a backend request is in flight

    // Generation results
    pub t2i_prompt: Option<String>,
    pub image: Option<GeneratedImage>,
    pub preview: Option<PreviewCache>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input (chars)

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Footer notice (save/open results)
    pub status: Option<String>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    // Backend access
    pub backend: BackendClient,
    pub events: UnboundedSender<AppEvent>,

    // Export locations
    pub image_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl App {
    pub fn new(
        backend: BackendClient,
        events: UnboundedSender<AppEvent>,
        image_dir: PathBuf,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            should_quit: false,
            phase: Phase::Interview,
            input_mode: InputMode::Editing,

            transcript: Transcript::new(),
            follow_up_count: 0,
            user_id: None,
            pending: false,

            t2i_prompt: None,
            image: None,
            preview: None,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_lines: 0,

            animation_frame: 0,

            status: None,

            chat_area: None,

            backend,
            events,

            image_dir,
            data_dir,
        }
    }

    /// Kick off `/start` in the background. Typing is allowed before the
    /// session id arrives; requests sent in the meantime carry a null id.
    pub fn start_session(&self) {
        session::spawn_start(self.backend.clone(), self.events.clone());
    }

    pub fn input_visible(&self) -> bool {
        self.phase == Phase::Interview
    }

    pub fn is_final_round(&self) -> bool {
        self.follow_up_count >= MAX_FOLLOW_UP_QUESTIONS
    }

    /// True while a request is running and the chat pane should show the
    /// thinking indicator. Once the design panel is up, progress shows
    /// there instead.
    pub fn thinking_visible(&self) -> bool {
        self.pending && self.phase != Phase::Complete
    }

    /// Submit the current input. Blank input does nothing; submits while a
    /// request is already in flight are ignored. The answer after the last
    /// follow-up starts the generation chain instead of another follow-up.
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.pending || self.phase != Phase::Interview {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.transcript.push(Sender::User, text.clone());
        self.pending = true;
        self.status = None;

        if self.is_final_round() {
            self.phase = Phase::Generating;
            self.input_mode = InputMode::Normal;
            session::spawn_generation(
                self.backend.clone(),
                self.events.clone(),
                self.user_id.clone(),
                text,
            );
        } else {
            session::spawn_follow_up(
                self.backend.clone(),
                self.events.clone(),
                self.user_id.clone(),
                text,
            );
        }

        self.scroll_chat_to_bottom();
    }

    /// Fold a background task result into the app state.
    pub fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started { user_id } => {
                self.user_id = Some(user_id);
            }
            SessionEvent::FollowUp { question } => {
                self.transcript.push(Sender::Assistant, question);
                self.follow_up_count = (self.follow_up_count + 1).min(MAX_FOLLOW_UP_QUESTIONS);
                self.pending = false;
                self.scroll_chat_to_bottom();
            }
            SessionEvent::FollowUpFailed => {
                // The answer stays in the transcript; the user can rephrase
                // and submit again.
                self.pending = false;
            }
            SessionEvent::Answer { answer } => {
                self.transcript.push(Sender::Ai, answer);
                self.scroll_chat_to_bottom();
            }
            SessionEvent::Prompt { prompt } => {
                self.t2i_prompt = Some(prompt);
                self.phase = Phase::Complete;
                self.input_mode = InputMode::Normal;
            }
            SessionEvent::Image(image) => {
                self.image = Some(image);
                self.preview = None;
                self.pending = false;
            }
            SessionEvent::GenerationFailed => {
                self.pending = false;
                if self.phase == Phase::Generating {
                    // The chain died before the prompt arrived; reopen the
                    // input so the final answer can be submitted again.
                    self.phase = Phase::Interview;
                }
            }
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        if self.chat_scroll < self.chat_lines.saturating_sub(self.chat_height) {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.chat_height / 2;
        let max_scroll = self.chat_lines.saturating_sub(self.chat_height);
        self.chat_scroll = (self.chat_scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    pub fn scroll_to_end(&mut self) {
        self.chat_scroll = self.chat_lines.saturating_sub(self.chat_height);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.pending {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the latest message and the thinking
    /// indicator are visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.transcript.messages() {
            total_lines += 1; // Sender line ("You:" / "Atelier:" / "AI:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.thinking_visible() {
            total_lines += 2; // Sender line + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use image::codecs::jpeg::JpegEncoder;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn test_app() -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = BackendClient::new("http://127.0.0.1:9");
        let app = App::new(backend, tx, std::env::temp_dir(), std::env::temp_dir());
        (app, rx)
    }

    fn test_image() -> GeneratedImage {
        let pixels = RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        pixels
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 90))
            .unwrap();
        GeneratedImage::from_base64(&BASE64.encode(&jpeg)).unwrap()
    }

    /// Answer the initial question and all follow-ups, then submit the
    /// final answer that starts the generation chain.
    fn advance_to_generating(app: &mut App) {
        for i in 0..MAX_FOLLOW_UP_QUESTIONS {
            app.input = format!("answer {}", i);
            app.submit_input();
            app.apply_session_event(SessionEvent::FollowUp {
                question: format!("question {}", i),
            });
        }
        app.input = "final answer".to_string();
        app.submit_input();
    }

    #[tokio::test]
    async fn test_blank_input_is_not_submitted() {
        let (mut app, _rx) = test_app();
        app.input = "   ".to_string();
        app.submit_input();

        assert!(app.transcript.is_empty());
        assert!(!app.pending);
        // The input is left as typed.
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_submit_records_answer_and_clears_input() {
        let (mut app, _rx) = test_app();
        app.input = "a silver pendant".to_string();
        app.submit_input();

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript.messages()[0].sender, Sender::User);
        assert!(app.pending);
        assert!(app.input.is_empty());
        assert_eq!(app.phase, Phase::Interview);
    }

    #[tokio::test]
    async fn test_submit_ignored_while_request_in_flight() {
        let (mut app, _rx) = test_app();
        app.input = "first".to_string();
        app.submit_input();

        app.input = "second".to_string();
        app.submit_input();

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.input, "second");
    }

    #[tokio::test]
    async fn test_follow_up_advances_counter() {
        let (mut app, _rx) = test_app();
        app.input = "a ring".to_string();
        app.submit_input();
        app.apply_session_event(SessionEvent::FollowUp {
            question: "Which metal?".to_string(),
        });

        assert_eq!(app.follow_up_count, 1);
        assert!(!app.pending);
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.messages()[1].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_follow_up_failure_keeps_progress() {
        let (mut app, _rx) = test_app();
        app.input = "a ring".to_string();
        app.submit_input();
        app.apply_session_event(SessionEvent::FollowUpFailed);

        assert!(!app.pending);
        assert_eq!(app.follow_up_count, 0);
        assert_eq!(app.phase, Phase::Interview);
        // The user message stays; a new submit is possible.
        assert_eq!(app.transcript.len(), 1);
        app.input = "a gold ring".to_string();
        app.submit_input();
        assert_eq!(app.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_starts_after_three_follow_ups() {
        let (mut app, _rx) = test_app();

        for i in 0..MAX_FOLLOW_UP_QUESTIONS {
            app.input = format!("answer {}", i);
            app.submit_input();
            assert_eq!(app.phase, Phase::Interview);
            app.apply_session_event(SessionEvent::FollowUp {
                question: format!("question {}", i),
            });
        }
        assert_eq!(app.follow_up_count, MAX_FOLLOW_UP_QUESTIONS);

        app.input = "final answer".to_string();
        app.submit_input();

        assert_eq!(app.phase, Phase::Generating);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.pending);
    }

    #[tokio::test]
    async fn test_follow_up_count_is_bounded() {
        let (mut app, _rx) = test_app();
        for _ in 0..5 {
            app.apply_session_event(SessionEvent::FollowUp {
                question: "again?".to_string(),
            });
        }
        assert_eq!(app.follow_up_count, MAX_FOLLOW_UP_QUESTIONS);
    }

    #[tokio::test]
    async fn test_prompt_completes_session() {
        let (mut app, _rx) = test_app();
        advance_to_generating(&mut app);

        app.apply_session_event(SessionEvent::Answer {
            answer: "A twisted gold band with a jade inlay.".to_string(),
        });
        assert_eq!(app.transcript.messages().last().unwrap().sender, Sender::Ai);

        app.apply_session_event(SessionEvent::Prompt {
            prompt: "studio photo, twisted gold band, jade inlay".to_string(),
        });
        assert_eq!(app.phase, Phase::Complete);
        assert!(app.t2i_prompt.is_some());

        // No further input is accepted.
        let before = app.transcript.len();
        app.input = "one more thing".to_string();
        app.submit_input();
        assert_eq!(app.transcript.len(), before);
    }

    #[tokio::test]
    async fn test_chain_failure_before_prompt_reopens_input() {
        let (mut app, _rx) = test_app();
        advance_to_generating(&mut app);

        app.apply_session_event(SessionEvent::GenerationFailed);

        assert_eq!(app.phase, Phase::Interview);
        assert!(!app.pending);
        assert!(app.input_visible());
    }

    #[tokio::test]
    async fn test_image_failure_after_prompt_keeps_design_panel() {
        let (mut app, _rx) = test_app();
        advance_to_generating(&mut app);
        app.apply_session_event(SessionEvent::Prompt {
            prompt: "studio photo".to_string(),
        });

        app.apply_session_event(SessionEvent::GenerationFailed);

        assert_eq!(app.phase, Phase::Complete);
        assert!(!app.pending);
        assert!(app.image.is_none());
    }

    #[tokio::test]
    async fn test_image_event_stores_image() {
        let (mut app, _rx) = test_app();
        advance_to_generating(&mut app);
        app.apply_session_event(SessionEvent::Prompt {
            prompt: "studio photo".to_string(),
        });

        app.apply_session_event(SessionEvent::Image(test_image()));

        assert!(app.image.is_some());
        assert!(app.preview.is_none());
        assert!(!app.pending);
    }

    #[tokio::test]
    async fn test_tick_animates_only_while_pending() {
        let (mut app, _rx) = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.pending = true;
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}

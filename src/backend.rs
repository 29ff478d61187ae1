use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

// Wire types. Field names match the backend exactly; `user_id` is optional
// because requests sent before `/start` resolves carry a JSON null, which
// the backend accepts.

#[derive(Deserialize)]
struct StartResponse {
    user_id: String,
}

#[derive(Serialize)]
struct ProcessRequest {
    user_id: Option<String>,
    user_response: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    follow_up_question: String,
}

#[derive(Serialize)]
struct AnswerRequest {
    user_id: Option<String>,
    user_response: String,
}

#[derive(Deserialize)]
struct AnswerResponse {
    ai_answer: String,
}

#[derive(Serialize)]
struct PromptRequest {
    user_id: Option<String>,
    ai_answer: String,
}

#[derive(Deserialize)]
struct PromptResponse {
    t2i_prompt: String,
}

#[derive(Serialize)]
struct ImageRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    base64_str: String,
}

/// Client for the design backend. Cheap to clone; background tasks each get
/// their own copy.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a session. Returns the user id the backend assigned.
    pub async fn start(&self) -> Result<String> {
        let url = format!("{}/start", self.base_url);
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("start request failed with status: {}", response.status()));
        }

        let start_response: StartResponse = response.json().await?;
        Ok(start_response.user_id)
    }

    /// Submit an interview answer and get the next follow-up question.
    pub async fn process(&self, user_id: Option<&str>, user_response: &str) -> Result<String> {
        let url = format!("{}/process", self.base_url);
        let request = ProcessRequest {
            user_id: user_id.map(str::to_string),
            user_response: user_response.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("process request failed with status: {}", response.status()));
        }

        let process_response: ProcessResponse = response.json().await?;
        Ok(process_response.follow_up_question)
    }

    /// Submit the final answer and get the AI's design answer.
    pub async fn ai_answer(&self, user_id: Option<&str>, user_response: &str) -> Result<String> {
        let url = format!("{}/ai_answer", self.base_url);
        let request = AnswerRequest {
            user_id: user_id.map(str::to_string),
            user_response: user_response.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("ai_answer request failed with status: {}", response.status()));
        }

        let answer_response: AnswerResponse = response.json().await?;
        Ok(answer_response.ai_answer)
    }

    /// Turn the AI answer into a text-to-image prompt.
    pub async fn t2i_prompt(&self, user_id: Option<&str>, ai_answer: &str) -> Result<String> {
        let url = format!("{}/t2i_prompt_generate", self.base_url);
        let request = PromptRequest {
            user_id: user_id.map(str::to_string),
            ai_answer: ai_answer.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "t2i_prompt_generate request failed with status: {}",
                response.status()
            ));
        }

        let prompt_response: PromptResponse = response.json().await?;
        Ok(prompt_response.t2i_prompt)
    }

    /// Render the prompt into an image. Returns the base64-encoded JPEG.
    pub async fn generate_image(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/image_generate", self.base_url);
        let request = ImageRequest {
            prompt: prompt.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "image_generate request failed with status: {}",
                response.status()
            ));
        }

        let image_response: ImageResponse = response.json().await?;
        Ok(image_response.base64_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_process_request_with_null_user_id() {
        let request = ProcessRequest {
            user_id: None,
            user_response: "a jade ring".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "user_id": null, "user_response": "a jade ring" }));
    }

    #[test]
    fn test_process_request_with_user_id() {
        let request = ProcessRequest {
            user_id: Some("u-42".to_string()),
            user_response: "gold, not silver".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({ "user_id": "u-42", "user_response": "gold, not silver" })
        );
    }

    #[test]
    fn test_response_field_names() {
        let start: StartResponse = serde_json::from_value(json!({ "user_id": "u-1" })).unwrap();
        assert_eq!(start.user_id, "u-1");

        let process: ProcessResponse =
            serde_json::from_value(json!({ "follow_up_question": "Which metal?" })).unwrap();
        assert_eq!(process.follow_up_question, "Which metal?");

        let answer: AnswerResponse =
            serde_json::from_value(json!({ "ai_answer": "A twisted gold band." })).unwrap();
        assert_eq!(answer.ai_answer, "A twisted gold band.");

        let prompt: PromptResponse =
            serde_json::from_value(json!({ "t2i_prompt": "studio photo, gold band" })).unwrap();
        assert_eq!(prompt.t2i_prompt, "studio photo, gold band");

        let image: ImageResponse =
            serde_json::from_value(json!({ "base64_str": "aGVsbG8=" })).unwrap();
        assert_eq!(image.base64_str, "aGVsbG8=");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BackendClient::new("http://127.0.0.1:3000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }
}

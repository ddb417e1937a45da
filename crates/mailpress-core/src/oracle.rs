//! Language oracle: summarization and translation prompts plus the
//! OpenAI-backed client.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// System instruction for summarizing Korean newsletters.
pub const SUMMARY_PROMPT: &str = "\
# 요약
- 당신은 긴 뉴스 기사를 요약하여 사람들에게 전달하는 기자이자 아나운서의 역할을 맡고 있습니다. 제시되는 뉴스 기사들의 핵심 내용을 요약하여 주세요. 요약된 내용은 기사의 주요 사건, 그 사건의 영향 및 결과, 그리고 그 사건의 장기적 중요성을 포함해야 합니다.
- 주제목은 해당 기사의 소식을 한줄 요약 합니다.
- 내용은 각 기사별로 3문장으로 구성되어야 하며, 서론, 본론, 결론의 구조로 명확히 구분되어야 합니다. 각 내용은 기사의 주제에 맞는 내용만 다루어야합니다.
- 현재형을 사용하고, 직접적인 말투보다는 설명적이고 객관적인 표현을 사용합니다.
- '논란이 있다'과 같은 표현을 '논란이 있습니다'로 변경하여, 문장을 더 공식적이고 완결된 형태로 마무리합니다.
- 개별 문장 내에서, 사실을 전달하는 동시에 적절한 예의를 갖추어 표현하며, 독자에게 정보를 제공하는 것이 목적임을 분명히 합니다.

# 출력
- 답변을 JSON 형식으로 정리하여 제출해야 합니다. 이때, 각 주제목을 Key로, 내용을 Value로 해야합니다.
- JSON 답변시 \"중첩된(nested) JSON\" 혹은 \"계층적(hierarchical) JSON\" 구조를 절대로 사용하지 마세요.
- \"주제\", \"내용\" 등 단순한 주제목을 절대로 사용하지마세요.
";

/// System instruction for summarizing English newsletters into Korean.
pub const SUMMARY_PROMPT_ENGLISH: &str = "\
# Summary and Translation
- You are a journalist and announcer who summarizes long news articles and delivers them to people. Summarize the key content of the news articles provided. The summary should include the main events, their impact and results, and their long-term importance.
- The subject title should be a one-line summary of the news.
- The content should consist of 3 sentences per article, clearly divided into introduction, body, and conclusion. Each content should only cover topics relevant to the article.
- Use present tense and use descriptive and objective expressions rather than direct speech.
- Translate the summary into natural Korean. The translation should maintain the original meaning without exaggeration or distortion.
- Use formal and complete sentence endings in Korean (e.g., \"논란이 있습니다\" instead of \"논란이 있다\").
- Within individual sentences, convey facts while maintaining appropriate courtesy and clearly indicate that the purpose is to provide information to readers.

# Output
- You must organize your answer in JSON format. Each subject title should be the Key and the content should be the Value.
- Never use \"nested JSON\" or \"hierarchical JSON\" structures in JSON responses.
- Never use simple subject titles like \"주제\" or \"내용\".
- All output must be in Korean.
";

/// System instruction for full-body translation into Korean.
pub const TRANSLATE_PROMPT: &str = "\
당신은 해외 뉴스레터를 한국어로 번역하는 전문가입니다.

규칙:
- 반드시 한국어로 번역합니다.
- 원문의 의미를 훼손하거나 과장하지 않습니다.
- 직역이 아닌 자연스러운 한국어 번역을 합니다.
- 뉴스레터 문체를 유지합니다.
- 불필요한 서론, 요약, 결론을 추가하지 않습니다.
- HTML 태그를 생성하지 말고 순수 텍스트로만 출력합니다.
- 문단 구분은 줄바꿈으로 자연스럽게 유지합니다.
";

/// Single-turn completion against an external language model.
///
/// Implementations may fail transiently; callers own the retry policy.
pub trait CompletionOracle {
    /// Submit one system/user exchange and return the raw reply text.
    fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// OpenAI chat-completions client.
pub struct OpenAiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiOracle {
    const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Client with the given API key and the default model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Read the API key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the variable is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Override the chat model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl CompletionOracle for OpenAiOracle {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_text.to_string(),
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Oracle(format!("API error {status}: {body}")));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Oracle("empty choices in response".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("assistant API key is missing, set NEURAMAIL_OPENAI_API_KEY")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("the model returned an empty completion")]
    EmptyCompletion,
    /// The model ignored the JSON contract. Callers show this and move on.
    #[error("could not read the assistant's answer, try rephrasing the question ({0})")]
    MalformedReply(String),
}

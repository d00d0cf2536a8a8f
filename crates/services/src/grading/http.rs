use std::env;

use async_trait::async_trait;
use log::warn;
use quiz_core::model::{Answer, QuizId, Score};
use quiz_core::session::Submission;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::Grader;
use crate::error::GradingError;

#[derive(Clone, Debug)]
pub struct HttpGraderConfig {
    pub endpoint: Url,
    pub token: Option<String>,
}

impl HttpGraderConfig {
    /// # Errors
    ///
    /// Returns `GradingError::InvalidEndpoint` if `endpoint` is not an absolute http(s) URL.
    pub fn new(endpoint: &str) -> Result<Self, GradingError> {
        let url = Url::parse(endpoint.trim())
            .map_err(|e| GradingError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GradingError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            endpoint: url,
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t| !t.trim().is_empty());
        self
    }

    /// Read `QUIZ_GRADER_URL` and the optional bearer `QUIZ_GRADER_TOKEN`.
    ///
    /// Returns `None` when no usable endpoint is configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("QUIZ_GRADER_URL").ok()?;
        if endpoint.trim().is_empty() {
            return None;
        }
        let config = match Self::new(&endpoint) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring QUIZ_GRADER_URL: {err}");
                return None;
            }
        };
        Some(match env::var("QUIZ_GRADER_TOKEN") {
            Ok(token) => config.with_token(token),
            Err(_) => config,
        })
    }
}

/// Grades by posting the submission to a remote answer-check endpoint.
#[derive(Clone)]
pub struct HttpGrader {
    client: Client,
    config: HttpGraderConfig,
}

impl HttpGrader {
    #[must_use]
    pub fn new(config: HttpGraderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Grader for HttpGrader {
    async fn check_answers(&self, submission: &Submission) -> Result<Score, GradingError> {
        let payload = GradeRequest {
            quiz_id: &submission.quiz_id,
            answers: &submission.answers,
        };

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(GradingError::HttpStatus(response.status()));
        }

        let body: GradeResponse = response.json().await?;
        validate(body, submission.answers.len())
    }
}

fn validate(body: GradeResponse, submitted: usize) -> Result<Score, GradingError> {
    let score = Score::new(body.score, body.total)?;
    if usize::try_from(score.total()).ok() != Some(submitted) {
        return Err(GradingError::TotalMismatch {
            submitted,
            total: score.total(),
        });
    }
    Ok(score)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeRequest<'a> {
    quiz_id: &'a QuizId,
    answers: &'a [Answer],
}

#[derive(Debug, Deserialize)]
struct GradeResponse {
    score: u32,
    total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn submission() -> Submission {
        Submission {
            quiz_id: QuizId::new("lesson-1").unwrap(),
            answers: vec![
                Answer::new(QuestionId::new("q1").unwrap(), "a"),
                Answer::new(QuestionId::new("q2").unwrap(), "b"),
            ],
        }
    }

    /// Serve one canned JSON response and hand back the raw request text.
    async fn serve_once(
        status: &'static str,
        body: String,
    ) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                    let len = head
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if rest.len() >= len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });
        (Url::parse(&format!("http://{addr}/grade")).unwrap(), handle)
    }

    #[test]
    fn config_rejects_non_http_endpoints() {
        assert!(HttpGraderConfig::new("ftp://example.com").is_err());
        assert!(HttpGraderConfig::new("not a url").is_err());
        let config = HttpGraderConfig::new("https://grader.example.com/check")
            .unwrap()
            .with_token("  ");
        assert!(config.token.is_none());
    }

    #[test]
    fn request_body_uses_wire_names() {
        let sub = submission();
        let payload = GradeRequest {
            quiz_id: &sub.quiz_id,
            answers: &sub.answers,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "quizId": "lesson-1",
                "answers": [
                    { "questionId": "q1", "answer": "a" },
                    { "questionId": "q2", "answer": "b" }
                ]
            })
        );
    }

    #[test]
    fn validate_rejects_inconsistent_scores() {
        assert!(matches!(
            validate(GradeResponse { score: 3, total: 2 }, 2),
            Err(GradingError::InvalidScore(_))
        ));
        assert!(matches!(
            validate(GradeResponse { score: 1, total: 5 }, 2),
            Err(GradingError::TotalMismatch { submitted: 2, total: 5 })
        ));
        assert_eq!(
            validate(GradeResponse { score: 1, total: 2 }, 2).unwrap(),
            Score::new(1, 2).unwrap()
        );
    }

    #[tokio::test]
    async fn posts_submission_and_reads_score() {
        let (url, server) = serve_once("200 OK", r#"{"score":1,"total":2}"#.to_string()).await;
        let config = HttpGraderConfig {
            endpoint: url,
            token: Some("secret".into()),
        };
        let grader = HttpGrader::new(config);

        let score = grader.check_answers(&submission()).await.unwrap();
        assert_eq!(score, Score::new(1, 2).unwrap());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /grade"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""quizId":"lesson-1""#));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (url, server) = serve_once("503 Service Unavailable", "{}".to_string()).await;
        let grader = HttpGrader::new(HttpGraderConfig {
            endpoint: url,
            token: None,
        });
        let err = grader.check_answers(&submission()).await.unwrap_err();
        assert!(matches!(err, GradingError::HttpStatus(s) if s.as_u16() == 503));
        server.await.unwrap();
    }
}

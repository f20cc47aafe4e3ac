//! Question endpoints.
//!
//! The list route returns the merged display list: enabled system fields and
//! persisted questions share one position namespace, so entries carry a
//! string id that is either a numeric question id or a system-field key.

use super::{reorder_ids, reorder_rejection, QuestionDto};
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::entities::{QuestionDraft, QuestionKind, QuestionPatch};
use marquee_core::ids::{EventId, ItemId, QuestionId};
use marquee_core::system_fields::QuestionEntry;
use serde::{Deserialize, Serialize};

/// Wire body for question create and update.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionBody {
    label: Option<String>,
    kind: Option<QuestionKind>,
    required: Option<bool>,
    items: Option<Vec<ItemId>>,
    options: Option<Vec<String>>,
}

impl QuestionBody {
    /// Create shape: missing text arrives empty and fails validation in the
    /// service; a missing kind falls back to free text.
    fn into_draft(self) -> QuestionDraft {
        QuestionDraft {
            label: self.label.unwrap_or_default(),
            kind: self.kind.unwrap_or(QuestionKind::Text),
            required: self.required.unwrap_or(false),
            item_ids: self.items.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
        }
    }

    fn into_patch(self) -> QuestionPatch {
        QuestionPatch {
            label: self.label,
            kind: self.kind,
            required: self.required,
            item_ids: self.items,
            options: self.options,
        }
    }
}

/// One row of the merged question list.
#[derive(Debug, Serialize)]
pub struct QuestionEntryDto {
    /// Numeric question id, or the system-field key.
    id: String,
    /// Display label.
    label: String,
    /// Rank in the shared namespace.
    position: i32,
    /// Whether an answer is mandatory.
    required: bool,
    /// Whether this row is a system field rather than a stored question.
    system: bool,
    /// Answer kind; absent for system fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<QuestionKind>,
}

impl From<QuestionEntry> for QuestionEntryDto {
    fn from(entry: QuestionEntry) -> Self {
        let id = entry.wire_id();
        let label = entry.label().to_string();
        let position = entry.position();
        let required = entry.required();
        let (system, kind) = match entry {
            QuestionEntry::System { .. } => (true, None),
            QuestionEntry::Custom(question) => (false, Some(question.kind)),
        };
        Self {
            id,
            label,
            position,
            required,
            system,
            kind,
        }
    }
}

/// One grouped answer in the detail statistics.
#[derive(Debug, Serialize)]
pub struct AnswerStatDto {
    /// The answer as given.
    answer: String,
    /// How many order positions gave it.
    count: i64,
    /// Share of the total, in percent.
    percentage: f64,
}

/// Question detail response.
#[derive(Debug, Serialize)]
pub struct QuestionDetailDto {
    question: QuestionDto,
    total_answers: i64,
    answers: Vec<AnswerStatDto>,
}

/// `GET /api/events/{event}/questions`
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
) -> Result<Json<Vec<QuestionEntryDto>>, AppError> {
    let entries = state.service.list_questions(actor.id, event).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// `POST /api/events/{event}/questions`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<QuestionDto>, AppError> {
    let question = state
        .service
        .create_question(actor.id, event, body.into_draft())
        .await?;
    Ok(Json(question.into()))
}

/// `GET /api/events/{event}/questions/{question}`
pub async fn detail(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, question)): Path<(EventId, QuestionId)>,
) -> Result<Json<QuestionDetailDto>, AppError> {
    let detail = state.service.question_detail(actor.id, event, question).await?;
    Ok(Json(QuestionDetailDto {
        question: detail.question.into(),
        total_answers: detail.total_answers,
        answers: detail
            .answers
            .into_iter()
            .map(|stat| AnswerStatDto {
                answer: stat.answer,
                count: stat.count,
                percentage: stat.percentage,
            })
            .collect(),
    }))
}

/// `PATCH /api/events/{event}/questions/{question}`
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, question)): Path<(EventId, QuestionId)>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<QuestionDto>, AppError> {
    let question = state
        .service
        .update_question(actor.id, event, question, body.into_patch())
        .await?;
    Ok(Json(question.into()))
}

/// `DELETE /api/events/{event}/questions/{question}`
pub async fn remove(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, question)): Path<(EventId, QuestionId)>,
) -> Result<StatusCode, AppError> {
    state.service.delete_question(actor.id, event, question).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/questions/reorder`
///
/// Mixed reorder: tokens are numeric question ids or system-field keys, and
/// the submitted set must cover both kinds completely. Tokens pass through
/// verbatim; the service resolves them.
pub async fn reorder(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(tokens) = reorder_ids(&body) else {
        return Ok(reorder_rejection());
    };
    state.service.reorder_questions(actor.id, event, &tokens).await?;
    Ok(StatusCode::OK.into_response())
}

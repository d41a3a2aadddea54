use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use studyx_services::dao::task::TaskQuery;

use super::task::{TaskResponse, visible_tasks};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub tasks: Vec<TaskResponse>,
}

/// Visible tasks grouped by due date, earliest first. `from`/`to` bound the
/// range inclusively.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarDay>>, ApiError> {
    let query = TaskQuery {
        due_from: params.from,
        due_to: params.to,
        ..Default::default()
    };
    let tasks = visible_tasks(&state, &auth.session(), &query).await?;

    // Tasks arrive sorted by due date; the map keeps the days in order.
    let mut days: BTreeMap<String, Vec<TaskResponse>> = BTreeMap::new();
    for task in tasks {
        days.entry(task.due_date.clone()).or_default().push(task);
    }

    Ok(Json(
        days.into_iter()
            .map(|(date, tasks)| CalendarDay { date, tasks })
            .collect(),
    ))
}

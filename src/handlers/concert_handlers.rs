//! Handlers for concert reads, writes, updates and deletes.

use axum::{
    extract::{RawForm, State},
    response::Response,
};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::concert::{Concert, NewConcert};
use crate::params::Params;
use crate::services::AppState;
use crate::services::directory_service::{DirectoryError, DirectoryService};

use super::{
    ARTIST_EXISTS, CONCERT_NOT_FOUND, CurrentUser, INCORRECT_INPUT, INVALID_FESTIVAL_ID, OK,
    PERMISSION_NOT_GRANTED, check_client, format_timestamp, json, parse_epoch, parse_record_id,
    text,
};

const ARTIST_MAX_LEN: usize = 255;

/// Serializes a concert the way read endpoints present it. The stage
/// number's key differs between the lineup listing and the single-record
/// document, so it is passed in.
fn concert_document(concert: &Concert, stage_key: &str) -> Value {
    let mut doc = Map::new();
    doc.insert("festival".to_string(), concert.festival_id.into());
    doc.insert("artist".to_string(), concert.artist.clone().into());
    doc.insert(stage_key.to_string(), concert.stage.into());
    doc.insert("day".to_string(), concert.day.into());
    doc.insert("start".to_string(), format_timestamp(&concert.start).into());
    doc.insert("end".to_string(), format_timestamp(&concert.end).into());
    doc.insert(
        "first_uploaded".to_string(),
        format_timestamp(&concert.first_uploaded).into(),
    );
    doc.insert(
        "last_modified".to_string(),
        format_timestamp(&concert.last_modified).into(),
    );
    Value::Object(doc)
}

/// POST `/backend/mult/conc/` — every concert of one festival.
pub async fn read_festival_concerts(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "read").await? {
        return Ok(refused);
    }

    let Some(raw_id) = params.get("id") else {
        return Ok(text(INVALID_FESTIVAL_ID));
    };
    let Some(id) = parse_record_id(raw_id) else {
        return Ok(text(INVALID_FESTIVAL_ID));
    };
    let festival = match state.directory.festival_by_id(id).await {
        Ok(festival) => festival,
        Err(DirectoryError::FestivalNotFound(_)) => return Ok(text(INVALID_FESTIVAL_ID)),
        Err(err) => return Err(err.into()),
    };

    let concerts = state.directory.concerts_for_festival(festival.id).await?;
    let data: Vec<Value> = concerts
        .iter()
        .map(|concert| concert_document(concert, "stage"))
        .collect();

    Ok(json(Value::Array(data)))
}

/// POST `/backend/r/conc/` — single concert document.
///
/// A missing or unresolvable identifier answers with an empty list
/// rather than a sentinel; a lookup miss is not an error here.
pub async fn read_concert_info(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "read").await? {
        return Ok(refused);
    }

    let empty = || json(Value::Array(Vec::new()));

    let Some(raw_id) = params.get("id") else {
        return Ok(empty());
    };
    let Some(id) = parse_record_id(raw_id) else {
        return Ok(empty());
    };
    let concert = match state.directory.concert_by_id(id).await {
        Ok(concert) => concert,
        Err(DirectoryError::ConcertNotFound(_)) => return Ok(empty()),
        Err(err) => return Err(err.into()),
    };

    Ok(json(concert_document(&concert, "scene")))
}

/// POST `/backend/w/conc/` — create a concert under a festival.
pub async fn write_concert_info(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "write").await? {
        return Ok(refused);
    }

    let Some(raw_festival) = params.get("festival") else {
        return Ok(text(INCORRECT_INPUT));
    };
    let Some(festival_id) = raw_festival.trim().parse::<i64>().ok() else {
        return Ok(text(INCORRECT_INPUT));
    };
    let festival = match state.directory.festival_by_id(festival_id).await {
        Ok(festival) => festival,
        Err(DirectoryError::FestivalNotFound(_)) => return Ok(text(INCORRECT_INPUT)),
        Err(err) => return Err(err.into()),
    };

    let Some(artist) = params.get("artist") else {
        return Ok(text(INCORRECT_INPUT));
    };
    if artist.chars().count() > ARTIST_MAX_LEN {
        return Ok(text(INCORRECT_INPUT));
    }
    if state.directory.artist_exists(artist).await? {
        return Ok(text(ARTIST_EXISTS));
    }

    let stage = match params.get("stage") {
        Some(raw) => match parse_record_id(raw) {
            Some(stage) => stage,
            None => return Ok(text(INCORRECT_INPUT)),
        },
        None => 1,
    };
    let day = match params.get("day") {
        Some(raw) => match parse_record_id(raw) {
            Some(day) => day,
            None => return Ok(text(INCORRECT_INPUT)),
        },
        None => 1,
    };

    let (Some(raw_start), Some(raw_end)) = (params.get("start"), params.get("end")) else {
        return Ok(text(INCORRECT_INPUT));
    };
    let Some(start) = parse_epoch(raw_start) else {
        return Ok(text(INCORRECT_INPUT));
    };
    let Some(end) = parse_epoch(raw_end) else {
        return Ok(text(INCORRECT_INPUT));
    };

    state
        .directory
        .create_concert(NewConcert {
            festival_id: festival.id,
            artist: artist.to_string(),
            stage,
            day,
            start,
            end,
        })
        .await?;

    Ok(text(OK))
}

/// Marker returned when an update value fails its field's validation.
#[derive(Debug)]
struct InvalidValue;

/// Applies the updatable concert fields present in `params`, in the
/// fixed field order, and returns the `field:value` lines describing
/// what changed. Timestamps echo their parsed form, not the raw input.
fn apply_updates(concert: &mut Concert, params: &Params) -> Result<String, InvalidValue> {
    let mut changes = String::new();

    if let Some(artist) = params.get("artist") {
        if artist.chars().count() > ARTIST_MAX_LEN {
            return Err(InvalidValue);
        }
        concert.artist = artist.to_string();
        changes.push_str(&format!("artist:{artist}\n"));
    }
    if let Some(raw) = params.get("stage") {
        let Some(stage) = parse_record_id(raw) else {
            return Err(InvalidValue);
        };
        concert.stage = stage;
        changes.push_str(&format!("stage:{raw}\n"));
    }
    if let Some(raw) = params.get("day") {
        let Some(day) = parse_record_id(raw) else {
            return Err(InvalidValue);
        };
        concert.day = day;
        changes.push_str(&format!("day:{raw}\n"));
    }
    if let Some(raw) = params.get("start") {
        let Some(start) = parse_epoch(raw) else {
            return Err(InvalidValue);
        };
        concert.start = start;
        changes.push_str(&format!("start:{}\n", format_timestamp(&start)));
    }
    if let Some(raw) = params.get("end") {
        let Some(end) = parse_epoch(raw) else {
            return Err(InvalidValue);
        };
        concert.end = end;
        changes.push_str(&format!("end:{}\n", format_timestamp(&end)));
    }

    Ok(changes)
}

/// POST `/backend/up/conc/` — partial update by the owner of the parent
/// festival.
pub async fn update_concert_info(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "write").await? {
        return Ok(refused);
    }

    let mut concert = match lookup_concert(&state.directory, &params).await? {
        Ok(concert) => concert,
        Err(refused) => return Ok(refused),
    };

    let festival = state.directory.festival_by_id(concert.festival_id).await?;
    if !festival.is_owned_by(user.id()) {
        return Ok(text(PERMISSION_NOT_GRANTED));
    }

    let changes = match apply_updates(&mut concert, &params) {
        Ok(changes) => changes,
        Err(InvalidValue) => return Ok(text(INCORRECT_INPUT)),
    };

    if !changes.is_empty() {
        state.directory.save_concert(&concert).await?;
    }

    Ok(text(changes))
}

/// POST `/backend/d/conc/` — delete by the owner of the parent festival.
pub async fn delete_concert(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "delete").await? {
        return Ok(refused);
    }

    let concert = match lookup_concert(&state.directory, &params).await? {
        Ok(concert) => concert,
        Err(refused) => return Ok(refused),
    };

    let festival = state.directory.festival_by_id(concert.festival_id).await?;
    if !festival.is_owned_by(user.id()) {
        return Ok(text(PERMISSION_NOT_GRANTED));
    }

    state.directory.delete_concert(concert.id).await?;
    Ok(text(OK))
}

/// Resolves the `id` parameter to a concert, or to the sentinel response
/// the caller should return instead.
async fn lookup_concert(
    directory: &DirectoryService,
    params: &Params,
) -> Result<Result<Concert, Response>, AppError> {
    let Some(raw_id) = params.get("id") else {
        return Ok(Err(text(CONCERT_NOT_FOUND)));
    };
    let Some(id) = parse_record_id(raw_id) else {
        return Ok(Err(text(CONCERT_NOT_FOUND)));
    };

    match directory.concert_by_id(id).await {
        Ok(concert) => Ok(Ok(concert)),
        Err(DirectoryError::ConcertNotFound(_)) => Ok(Err(text(CONCERT_NOT_FOUND))),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn concert() -> Concert {
        let start = Utc.with_ymd_and_hms(2016, 3, 5, 12, 0, 0).unwrap();
        Concert {
            id: 1,
            festival_id: 1,
            artist: "headliner".to_string(),
            stage: 1,
            day: 1,
            start,
            end: start,
            first_uploaded: start,
            last_modified: start,
        }
    }

    #[test]
    fn updates_apply_in_field_order_and_echo_each_field() {
        let mut concert = concert();
        // Request order differs from field order on purpose.
        let params = Params::parse(b"day=2&artist=openers&stage=03");

        let changes = apply_updates(&mut concert, &params).unwrap();

        assert_eq!(changes, "artist:openers\nstage:03\nday:2\n");
        assert_eq!(concert.artist, "openers");
        assert_eq!(concert.stage, 3);
        assert_eq!(concert.day, 2);
    }

    #[test]
    fn timestamps_echo_their_parsed_form() {
        let mut concert = concert();
        let params = Params::parse(b"start=1456920000");

        let changes = apply_updates(&mut concert, &params).unwrap();

        assert_eq!(changes, "start:2016-03-02 12:00:00+00:00\n");
    }

    #[test]
    fn non_numeric_stage_or_day_rejects_the_update() {
        let mut concert = concert();
        assert!(apply_updates(&mut concert, &Params::parse(b"stage=main")).is_err());
        assert!(apply_updates(&mut concert, &Params::parse(b"day=-1")).is_err());
    }

    #[test]
    fn malformed_timestamps_reject_the_update() {
        let mut concert = concert();
        assert!(apply_updates(&mut concert, &Params::parse(b"start=soon")).is_err());
    }
}

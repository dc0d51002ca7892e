//! Handlers for festival reads, writes, updates, deletes and votes.

use axum::{
    extract::{RawForm, State},
    http::StatusCode,
    response::Response,
};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::festival::{Festival, NewFestival};
use crate::params::Params;
use crate::services::AppState;
use crate::services::directory_service::{DirectoryError, DirectoryService, FestivalFilter};

use super::{
    CurrentUser, INCORRECT_INPUT, INVALID_FESTIVAL_ID, NAME_EXISTS, OK, PERMISSION_NOT_GRANTED,
    check_client, format_timestamp, json, parse_record_id, text,
};

/// Length bounds for the optional fields accepted at creation.
const CREATE_FIELD_BOUNDS: &[(&str, usize)] = &[
    ("description", 800),
    ("country", 50),
    ("city", 90),
    ("address", 200),
    ("genre", 100),
    ("prices", 400),
];

const NAME_MAX_LEN: usize = 255;

type FieldSetter = fn(&mut Festival, String);

/// The allow-list of fields a partial update may touch, each with its
/// length bound and setter. Unknown request keys are ignored.
const UPDATABLE_FIELDS: &[(&str, usize, FieldSetter)] = &[
    ("name", 255, |festival, value| festival.name = value),
    ("description", 800, |festival, value| {
        festival.description = value
    }),
    ("country", 50, |festival, value| festival.country = value),
    ("city", 90, |festival, value| festival.city = value),
    ("address", 200, |festival, value| festival.address = value),
    ("genre", 100, |festival, value| festival.genre = value),
    ("prices", 400, |festival, value| festival.prices = value),
];

/// Marker returned when an update value exceeds its field's bound.
#[derive(Debug)]
struct ValueTooLong;

/// Applies every allow-listed field present in `params` to `festival`,
/// in request order, and returns the `field:value` lines describing what
/// changed.
fn apply_updates(festival: &mut Festival, params: &Params) -> Result<String, ValueTooLong> {
    let mut changes = String::new();

    for (key, value) in params.pairs() {
        let Some((_, max_len, setter)) = UPDATABLE_FIELDS.iter().find(|(name, _, _)| *name == key)
        else {
            continue;
        };
        if value.chars().count() > *max_len {
            return Err(ValueTooLong);
        }
        setter(festival, value.to_string());
        changes.push_str(&format!("{key}:{value}\n"));
    }

    Ok(changes)
}

/// Serializes a festival the way read endpoints present it. The voter
/// count's key differs between the single-record and list documents, so
/// it is passed in.
async fn festival_document(
    directory: &DirectoryService,
    festival: &Festival,
    votes_key: &str,
) -> Result<Value, AppError> {
    let uploader = directory.username_of(festival.owner_id).await?;
    let downloads = directory.download_count(festival.id).await?;
    let voters = directory.voter_count(festival.id).await?;

    let mut doc = Map::new();
    doc.insert("id".to_string(), festival.id.into());
    doc.insert("name".to_string(), festival.name.clone().into());
    doc.insert(
        "description".to_string(),
        festival.description.clone().into(),
    );
    doc.insert("country".to_string(), festival.country.clone().into());
    doc.insert("city".to_string(), festival.city.clone().into());
    doc.insert("address".to_string(), festival.address.clone().into());
    doc.insert("genre".to_string(), festival.genre.clone().into());
    doc.insert("prices".to_string(), festival.prices.clone().into());
    doc.insert("uploader".to_string(), uploader.into());
    doc.insert("official".to_string(), festival.official.into());
    doc.insert("downloads".to_string(), downloads.into());
    doc.insert(votes_key.to_string(), voters.into());
    doc.insert(
        "first_uploaded".to_string(),
        format_timestamp(&festival.first_uploaded).into(),
    );
    doc.insert(
        "last_modified".to_string(),
        format_timestamp(&festival.last_modified).into(),
    );

    Ok(Value::Object(doc))
}

/// POST `/backend/mult/fest/` — filtered festival listing.
pub async fn read_multiple_festivals(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "read").await? {
        return Ok(refused);
    }

    // Without a scan budget there is nothing to return.
    let Some(num) = params.get("num") else {
        return Ok(json(Value::Array(Vec::new())));
    };
    let counter: i64 = num
        .trim()
        .parse()
        .map_err(|_| AppError::new(StatusCode::BAD_REQUEST, "`num` must be an integer"))?;

    let filter = FestivalFilter {
        official: params.get("official").map(|value| !value.is_empty()),
        name: params.get("name").map(str::to_string),
        country: params.get("country").map(str::to_string),
        city: params.get("city").map(str::to_string),
        genre: params.get("genre").map(str::to_string),
        min_price: params.get("min_price").map(str::to_string),
        max_price: params.get("max_price").map(str::to_string),
        artist: params.get("artist").map(str::to_string),
    };

    let festivals = state.directory.filter_festivals(&filter, counter).await?;

    let mut data = Vec::with_capacity(festivals.len());
    for festival in &festivals {
        data.push(festival_document(&state.directory, festival, "votes").await?);
    }

    Ok(json(Value::Array(data)))
}

/// POST `/backend/r/fest/` — single festival document.
pub async fn read_festival_info(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "read").await? {
        return Ok(refused);
    }

    let festival = match lookup_festival(&state.directory, &params).await? {
        Ok(festival) => festival,
        Err(refused) => return Ok(refused),
    };

    let doc = festival_document(&state.directory, &festival, "voters").await?;
    Ok(json(doc))
}

/// POST `/backend/w/fest/` — create a festival owned by the requester.
pub async fn write_festival_info(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "write").await? {
        return Ok(refused);
    }

    let Some(name) = params.get("name") else {
        return Ok(text(INCORRECT_INPUT));
    };
    if name.chars().count() > NAME_MAX_LEN {
        return Ok(text(INCORRECT_INPUT));
    }
    if state.directory.festival_name_exists(name).await? {
        return Ok(text(NAME_EXISTS));
    }

    for (field, max_len) in CREATE_FIELD_BOUNDS {
        if let Some(value) = params.get(field) {
            if value.chars().count() > *max_len {
                return Ok(text(INCORRECT_INPUT));
            }
        }
    }

    // Long-standing contract of this endpoint: every optional text field
    // writes through to `description`, and the last one present wins.
    let mut description = String::new();
    for (field, _) in CREATE_FIELD_BOUNDS {
        if let Some(value) = params.get(field) {
            description = value.to_string();
        }
    }

    let official = params.get("official").is_some_and(|value| !value.is_empty());

    state
        .directory
        .create_festival(NewFestival {
            name: name.to_string(),
            description,
            official,
            owner_id: user.id(),
        })
        .await?;

    Ok(text(OK))
}

/// POST `/backend/up/fest/` — partial update by the festival's owner.
pub async fn update_festival_info(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "write").await? {
        return Ok(refused);
    }

    let mut festival = match lookup_festival(&state.directory, &params).await? {
        Ok(festival) => festival,
        Err(refused) => return Ok(refused),
    };

    if !festival.is_owned_by(user.id()) {
        return Ok(text(PERMISSION_NOT_GRANTED));
    }

    let changes = match apply_updates(&mut festival, &params) {
        Ok(changes) => changes,
        Err(ValueTooLong) => return Ok(text(INCORRECT_INPUT)),
    };

    if !changes.is_empty() {
        state.directory.save_festival(&festival).await?;
    }

    Ok(text(changes))
}

/// POST `/backend/d/fest/` — delete by the festival's owner.
pub async fn delete_festival(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "delete").await? {
        return Ok(refused);
    }

    let festival = match lookup_festival(&state.directory, &params).await? {
        Ok(festival) => festival,
        Err(refused) => return Ok(refused),
    };

    if !festival.is_owned_by(user.id()) {
        return Ok(text(PERMISSION_NOT_GRANTED));
    }

    state.directory.delete_festival(festival.id).await?;
    Ok(text(OK))
}

/// POST `/backend/v/` — add the requester to the festival's voter set and
/// report the voter count.
pub async fn vote(
    State(state): State<AppState>,
    user: CurrentUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    if let Some(refused) = check_client(&state.directory, &params, "vote").await? {
        return Ok(refused);
    }

    let festival = match lookup_festival(&state.directory, &params).await? {
        Ok(festival) => festival,
        Err(refused) => return Ok(refused),
    };

    let voters = state.directory.vote(festival.id, user.id()).await?;
    Ok(text(voters.to_string()))
}

/// Resolves the `id` parameter to a festival, or to the sentinel response
/// the caller should return instead.
async fn lookup_festival(
    directory: &DirectoryService,
    params: &Params,
) -> Result<Result<Festival, Response>, AppError> {
    let Some(raw_id) = params.get("id") else {
        return Ok(Err(text(INVALID_FESTIVAL_ID)));
    };
    let Some(id) = parse_record_id(raw_id) else {
        return Ok(Err(text(INVALID_FESTIVAL_ID)));
    };

    match directory.festival_by_id(id).await {
        Ok(festival) => Ok(Ok(festival)),
        Err(DirectoryError::FestivalNotFound(_)) => Ok(Err(text(INVALID_FESTIVAL_ID))),
        Err(err) => Err(err.into()),
    }
}

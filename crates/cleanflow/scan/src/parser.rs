//! Payload parser: turns a raw scanned string into a [`ScanPayload`]
//!
//! Three wire formats are accepted. QR codes use either the hyphen
//! token format or the `cleanflow://` query-string format, tried in that
//! order. NFC tags use the colon format only. Parsing is purely
//! syntactic: no catalog or network access happens here.
//!
//! ```text
//! CF-AREA-{areaId}-PROTOCOL-{procedureId}
//! cleanflow://area={areaId}&protocol={procedureId}&name={label}
//! {areaId}:{assetType}
//! ```

use cleanflow_types::{ParseError, ProcedureId, ScanPayload, ScanSource};

/// Leading literal of the hyphen token format
pub const TOKEN_PREFIX: &str = "CF";
/// Literal preceding the area id in the hyphen token format
pub const AREA_TOKEN: &str = "AREA";
/// Literal preceding the procedure id in the hyphen token format
pub const PROTOCOL_TOKEN: &str = "PROTOCOL";
/// Scheme of the query-string format
pub const QUERY_SCHEME: &str = "cleanflow://";

const AREA_KEY: &str = "area";
const PROTOCOL_KEY: &str = "protocol";
const NAME_KEY: &str = "name";

/// Parse a raw scan according to the formats accepted for its source
pub fn parse(source: ScanSource, raw: &str) -> Result<ScanPayload, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let result = match source {
        ScanSource::Qr => parse_qr(raw),
        ScanSource::Nfc => parse_nfc(raw),
    };

    match &result {
        Ok(payload) => tracing::debug!(
            source = %source,
            area_id = %payload.area_id(),
            procedure_id = payload.procedure_id().map(|p| p.as_str()),
            "Scan payload decoded"
        ),
        Err(e) => tracing::debug!(source = %source, error = %e, "Scan payload rejected"),
    }

    result
}

/// QR codes: hyphen token format first, then the query-string format
fn parse_qr(raw: &str) -> Result<ScanPayload, ParseError> {
    if let Some(result) = try_token_format(raw) {
        return result;
    }
    if let Some(result) = try_query_format(raw) {
        return result;
    }
    Err(ParseError::MalformedTokenFormat(format!(
        "expected '{TOKEN_PREFIX}-{AREA_TOKEN}-..-{PROTOCOL_TOKEN}-..' or '{QUERY_SCHEME}..'"
    )))
}

// ── Hyphen token format ──────────────────────────────────────────────

/// Returns `None` when the string does not start with the `CF` token.
///
/// Ids may themselves contain hyphens, so the area id is every token
/// between `AREA` and the first `PROTOCOL` token after it, and the
/// procedure id is everything after that.
fn try_token_format(raw: &str) -> Option<Result<ScanPayload, ParseError>> {
    let tokens: Vec<&str> = raw.split('-').collect();
    if tokens.first() != Some(&TOKEN_PREFIX) {
        return None;
    }
    Some(parse_tokens(&tokens))
}

fn parse_tokens(tokens: &[&str]) -> Result<ScanPayload, ParseError> {
    if tokens.len() < 5 {
        return Err(ParseError::MalformedTokenFormat(format!(
            "expected at least 5 tokens, found {}",
            tokens.len()
        )));
    }
    if tokens[1] != AREA_TOKEN {
        return Err(ParseError::MalformedTokenFormat(format!(
            "expected '{AREA_TOKEN}' at position 1, found '{}'",
            tokens[1]
        )));
    }

    let protocol_pos = tokens
        .iter()
        .enumerate()
        .skip(3)
        .find(|(_, t)| **t == PROTOCOL_TOKEN)
        .map(|(i, _)| i)
        .ok_or_else(|| {
            ParseError::MalformedTokenFormat(format!(
                "expected '{PROTOCOL_TOKEN}' at position 3, found '{}'",
                tokens[3]
            ))
        })?;

    let area_id = tokens[2..protocol_pos].join("-");
    let procedure_id = tokens[protocol_pos + 1..].join("-");
    if area_id.is_empty() || procedure_id.is_empty() {
        return Err(ParseError::MalformedTokenFormat(
            "area and protocol ids must not be empty".into(),
        ));
    }

    ScanPayload::qr(area_id, Some(ProcedureId::new(procedure_id)))
        .ok_or(ParseError::MissingRequiredField(AREA_KEY))
}

// ── Query-string format ──────────────────────────────────────────────

/// Returns `None` when the string does not carry the `cleanflow://` scheme.
fn try_query_format(raw: &str) -> Option<Result<ScanPayload, ParseError>> {
    let rest = raw.strip_prefix(QUERY_SCHEME)?;
    // Tolerate a host/path segment: cleanflow://scan?area=..
    // A '?' after the first key belongs to a value.
    let query = match rest.split_once('?') {
        Some((head, q)) if !head.contains('=') && !head.contains('&') => q,
        _ => rest,
    };
    Some(parse_query(query))
}

fn parse_query(query: &str) -> Result<ScanPayload, ParseError> {
    let mut area = None;
    let mut protocol = None;
    let mut name = None;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let slot = match key {
            AREA_KEY => &mut area,
            PROTOCOL_KEY => &mut protocol,
            NAME_KEY => &mut name,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(decode(key, value)?);
        }
    }

    let area = area
        .filter(|a| !a.is_empty())
        .ok_or(ParseError::MissingRequiredField(AREA_KEY))?;
    let name = name
        .filter(|n| !n.is_empty())
        .ok_or(ParseError::MissingRequiredField(NAME_KEY))?;

    let payload = ScanPayload::qr(area, protocol.map(ProcedureId::new))
        .ok_or(ParseError::MissingRequiredField(AREA_KEY))?;
    Ok(payload.with_label(name))
}

fn decode(key: &str, value: &str) -> Result<String, ParseError> {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .map_err(|_| ParseError::InvalidEncoding {
            field: key.to_string(),
        })
}

// ── NFC colon format ─────────────────────────────────────────────────

fn parse_nfc(raw: &str) -> Result<ScanPayload, ParseError> {
    let tokens: Vec<&str> = raw.split(':').collect();
    let [area_id, asset_type] = tokens.as_slice() else {
        return Err(ParseError::MalformedTokenFormat(format!(
            "expected 'areaId:assetType', found {} token(s)",
            tokens.len()
        )));
    };
    if asset_type.is_empty() {
        return Err(ParseError::MalformedTokenFormat(
            "asset type must not be empty".into(),
        ));
    }
    ScanPayload::nfc(*area_id, *asset_type)
        .ok_or_else(|| ParseError::MalformedTokenFormat("area id must not be empty".into()))
}

// ── Encoders ─────────────────────────────────────────────────────────

/// Render a hyphen token code for printing on a label
pub fn format_token_code(area_id: &str, procedure_id: &str) -> String {
    format!("{TOKEN_PREFIX}-{AREA_TOKEN}-{area_id}-{PROTOCOL_TOKEN}-{procedure_id}")
}

/// Render a query-string code, percent-encoding every value
pub fn format_query_code(area_id: &str, procedure_id: Option<&str>, name: &str) -> String {
    let mut code = format!("{QUERY_SCHEME}{AREA_KEY}={}", urlencoding::encode(area_id));
    if let Some(procedure_id) = procedure_id {
        code.push_str(&format!(
            "&{PROTOCOL_KEY}={}",
            urlencoding::encode(procedure_id)
        ));
    }
    code.push_str(&format!("&{NAME_KEY}={}", urlencoding::encode(name)));
    code
}

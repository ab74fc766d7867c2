// Ethernet Bundle - Request Handlers
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Resource routing for bus requests.
//!
//! | Resource                     | Method | Operation                 |
//! |------------------------------|--------|---------------------------|
//! | `/network/ethernets`         | GET    | list records (`?id=1,2`)  |
//! | `/network/ethernets/:id`     | GET    | read one record           |
//! | `/network/ethernets`         | PUT    | bulk update               |
//! | `/network/ethernets/:id`     | PUT    | single update             |
//! | `/network/interfaces/:iface` | PUT    | DHCP lease update         |

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::bus::{Method, Notifier, Request, Response};
use crate::models::validation::{parse_lease, parse_update, parse_updates};
use crate::models::{Error, ETHERNETS_RESOURCE, INTERFACES_RESOURCE};
use crate::network_utils::NetworkAdapter;
use crate::reconciler::Reconciler;

const NO_SUCH_DEVICE: &str = "No such device.";

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Ethernets,
    Ethernet(&'a str),
    Interface(&'a str),
    Unknown,
}

fn route(path: &str) -> Route<'_> {
    let path = path.trim_end_matches('/');
    if path == ETHERNETS_RESOURCE {
        return Route::Ethernets;
    }
    let nested = |base: &str| {
        path.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
    };
    if let Some(id) = nested(ETHERNETS_RESOURCE) {
        Route::Ethernet(id)
    } else if let Some(iface) = nested(INTERFACES_RESOURCE) {
        Route::Interface(iface)
    } else {
        Route::Unknown
    }
}

/// Collect `id` filters from a query string (`id=1,2` or `id=1&id=2`).
fn parse_id_filter(query: &str) -> Result<Option<Vec<u32>>, String> {
    let mut ids: Option<Vec<u32>> = None;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != "id" {
            continue;
        }
        let list = ids.get_or_insert_with(Vec::new);
        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id = item
                .parse::<u32>()
                .map_err(|_| format!("Invalid id \"{}\".", item))?;
            list.push(id);
        }
    }
    Ok(ids)
}

fn error_response(err: &Error) -> Response {
    match err {
        Error::NotFound(_) => Response::error(404, NO_SUCH_DEVICE),
        other => Response::error(other.status_code(), other.to_string()),
    }
}

fn serialized<T: Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(data) => Response::ok(data),
        Err(e) => Response::error(500, e.to_string()),
    }
}

/// Route `request` to the reconciler and send the response(s) through `reply`.
///
/// `reply` is called exactly once per request.
pub fn dispatch<A, N>(
    reconciler: &mut Reconciler<A, N>,
    request: &Request,
    reply: &mut dyn FnMut(Response),
) where
    A: NetworkAdapter,
    N: Notifier,
{
    let (path, query) = request
        .resource
        .split_once('?')
        .unwrap_or((request.resource.as_str(), ""));

    match (route(path), request.method) {
        (Route::Ethernets, Method::Get) => reply(get_list(reconciler, query)),
        (Route::Ethernet(id), Method::Get) => reply(get_one(reconciler, id)),
        (Route::Ethernets, Method::Put) => reply(put_bulk(reconciler, request.data.as_ref())),
        (Route::Ethernet(id), Method::Put) => put_one(reconciler, id, request.data.as_ref(), reply),
        (Route::Interface(iface), Method::Put) => {
            reply(put_lease(reconciler, iface, request.data.as_ref()))
        }
        (Route::Unknown, _) => reply(Response::error(404, "No such resource.")),
        (_, method) => {
            warn!("Unsupported {:?} on {}", method, path);
            reply(Response::error(405, "Method not allowed."))
        }
    }
}

fn get_list<A: NetworkAdapter, N: Notifier>(
    reconciler: &Reconciler<A, N>,
    query: &str,
) -> Response {
    match parse_id_filter(query) {
        Ok(ids) => serialized(&reconciler.list(ids.as_deref())),
        Err(message) => Response::error(400, message),
    }
}

fn get_one<A: NetworkAdapter, N: Notifier>(reconciler: &Reconciler<A, N>, id: &str) -> Response {
    let Ok(id) = id.parse::<u32>() else {
        return Response::error(400, format!("Invalid id \"{}\".", id));
    };
    match reconciler.read(id, false, true) {
        Ok(record) => serialized(&record),
        Err(e) => error_response(&e),
    }
}

fn put_one<A: NetworkAdapter, N: Notifier>(
    reconciler: &mut Reconciler<A, N>,
    id: &str,
    data: Option<&Value>,
    reply: &mut dyn FnMut(Response),
) {
    let Ok(id) = id.parse::<u32>() else {
        return reply(Response::error(400, format!("Invalid id \"{}\".", id)));
    };
    let mut body = match data {
        Some(Value::Object(map)) => map.clone(),
        _ => return reply(Response::error(400, "Invalid input: data: expected an object")),
    };
    body.insert("id".to_string(), json!(id));

    let update = match parse_update(&Value::Object(body)) {
        Ok(update) => update,
        Err(e) => return reply(error_response(&Error::from(e))),
    };
    let mut replied = false;
    let result = reconciler.put_one(&update, |outcome| {
        reply(serialized(&outcome.record));
        replied = true;
    });

    match result {
        Ok(_) if replied => {}
        Ok(outcome) => reply(serialized(&outcome.record)),
        Err(e) if replied => error!("Failed to apply record {} after replying: {}", id, e),
        Err(e) => reply(error_response(&e)),
    }
}

fn put_bulk<A: NetworkAdapter, N: Notifier>(
    reconciler: &mut Reconciler<A, N>,
    data: Option<&Value>,
) -> Response {
    let updates = match parse_updates(data.unwrap_or(&Value::Null)) {
        Ok(updates) => updates,
        Err(e) => return error_response(&Error::from(e)),
    };

    let items: Vec<Value> = reconciler
        .put_bulk(&updates)
        .into_iter()
        .map(|item| match item.result {
            Ok(outcome) => json!({
                "id": item.id,
                "code": 200,
                "data": serde_json::to_value(&outcome.record).unwrap_or(Value::Null),
            }),
            Err(e) => {
                let failure = error_response(&e);
                json!({
                    "id": item.id,
                    "code": failure.code,
                    "message": failure.data["message"],
                })
            }
        })
        .collect();

    Response::ok(Value::Array(items))
}

fn put_lease<A: NetworkAdapter, N: Notifier>(
    reconciler: &mut Reconciler<A, N>,
    iface: &str,
    data: Option<&Value>,
) -> Response {
    let lease = match parse_lease(data.unwrap_or(&Value::Null)) {
        Ok(lease) => lease,
        Err(e) => return error_response(&Error::from(e)),
    };
    match reconciler.apply_lease(iface, &lease) {
        Ok(record) => serialized(&record),
        Err(Error::NotFound(_)) => {
            error_response(&Error::UnknownDevice(iface.to_string()))
        }
        Err(e) => error_response(&e),
    }
}

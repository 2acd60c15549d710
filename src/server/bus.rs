//! The broker's own `org.freedesktop.DBus` interface.

use crate::error::Result;
use crate::names::validate_bus_name;
use crate::org_freedesktop_dbus as fdo;
use crate::proto::Flags;
use crate::{BodyBuf, MatchRule, Message, MessageKind};

use super::{RemoteId, Server};

/// Dispatch a message addressed to the bus itself.
pub(super) fn dispatch(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let MessageKind::MethodCall { member, .. } = message.kind() else {
        // Signals directed at the bus are dropped.
        return Ok(());
    };

    match member {
        "Hello" => error_reply(
            server,
            id,
            message,
            fdo::ERR_FAILED,
            "connection already has a unique name",
        ),
        "RequestName" => request_name(server, id, message),
        "ReleaseName" => release_name(server, id, message),
        "ListNames" => list_names(server, id, message),
        "GetNameOwner" => get_name_owner(server, id, message),
        "AddMatch" => add_match(server, id, message),
        "RemoveMatch" => remove_match(server, id, message),
        _ => error_reply(
            server,
            id,
            message,
            fdo::ERR_UNKNOWN_METHOD,
            &format!("no method {member} on the bus"),
        ),
    }
}

fn request_name(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let mut args = message.body();

    let (Ok(name), Ok(flags)) = (
        args.read::<str>(),
        args.load::<crate::org_freedesktop_dbus::NameFlag>(),
    ) else {
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, "expected (su)");
    };

    if validate_bus_name(name).is_err() || name.starts_with(':') || name == fdo::DESTINATION {
        let text = format!("cannot acquire name {name:?}");
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, &text);
    }

    let name = name.to_owned();
    let (reply, transition) = server.queues().request(id.0, &name, flags);

    if let Some(transition) = transition {
        server.announce_transition(&name, transition);
    }

    let mut body = BodyBuf::new();
    body.store(reply)?;
    method_reply(server, id, message, &body)
}

fn release_name(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let mut args = message.body();

    let Ok(name) = args.read::<str>() else {
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, "expected (s)");
    };

    if name.starts_with(':') || name == fdo::DESTINATION {
        let text = format!("cannot release name {name:?}");
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, &text);
    }

    let name = name.to_owned();
    let (reply, transition) = server.queues().release(id.0, &name);

    if let Some(transition) = transition {
        server.announce_transition(&name, transition);
    }

    let mut body = BodyBuf::new();
    body.store(reply)?;
    method_reply(server, id, message, &body)
}

fn list_names(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let names = server
        .queues_ref()
        .names()
        .map(Box::from)
        .collect::<Vec<Box<str>>>();

    let mut body = BodyBuf::new();
    let mut array = body.store_array::<crate::ty::Str>()?;
    array.store(fdo::DESTINATION);

    for name in &names {
        array.store(&**name);
    }

    array.finish();
    method_reply(server, id, message, &body)
}

fn get_name_owner(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let mut args = message.body();

    let Ok(name) = args.read::<str>() else {
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, "expected (s)");
    };

    let owner: Option<Box<str>> = if name == fdo::DESTINATION {
        Some(Box::from(fdo::DESTINATION))
    } else {
        server
            .queues_ref()
            .owner(name)
            .and_then(|owner| server.remote_unique(owner))
            .map(Box::from)
    };

    let Some(owner) = owner else {
        let text = format!("name {name:?} has no owner");
        return error_reply(server, id, message, fdo::ERR_NAME_HAS_NO_OWNER, &text);
    };

    let mut body = BodyBuf::new();
    body.store::<&str>(&*owner)?;
    method_reply(server, id, message, &body)
}

fn add_match(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let mut args = message.body();

    let Ok(rule) = args.read::<str>() else {
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, "expected (s)");
    };

    let rule = match MatchRule::parse(rule) {
        Ok(rule) => rule,
        Err(error) => {
            let text = error.to_string();
            return error_reply(server, id, message, fdo::ERR_MATCH_RULE_INVALID, &text);
        }
    };

    if let Some(matches) = server.remote_matches(id.0) {
        matches.push(rule);
    }

    method_reply(server, id, message, &BodyBuf::new())
}

fn remove_match(server: &mut Server, id: RemoteId, message: &Message<'_>) -> Result<()> {
    let mut args = message.body();

    let Ok(rule) = args.read::<str>() else {
        return error_reply(server, id, message, fdo::ERR_INVALID_ARGS, "expected (s)");
    };

    let rule = match MatchRule::parse(rule) {
        Ok(rule) => rule,
        Err(error) => {
            let text = error.to_string();
            return error_reply(server, id, message, fdo::ERR_MATCH_RULE_INVALID, &text);
        }
    };

    let removed = match server.remote_matches(id.0) {
        Some(matches) => match matches.iter().position(|other| *other == rule) {
            Some(at) => {
                matches.remove(at);
                true
            }
            None => false,
        },
        None => false,
    };

    if !removed {
        return error_reply(
            server,
            id,
            message,
            fdo::ERR_MATCH_RULE_NOT_FOUND,
            "no such match rule",
        );
    }

    method_reply(server, id, message, &BodyBuf::new())
}

/// Send a method return for a bus call, unless the caller asked for no
/// reply.
fn method_reply(
    server: &mut Server,
    id: RemoteId,
    request: &Message<'_>,
    body: &BodyBuf,
) -> Result<()> {
    if request.flags() & Flags::NO_REPLY_EXPECTED {
        return Ok(());
    }

    let reply = request
        .method_return(server.next_serial())
        .with_sender(fdo::DESTINATION)
        .with_body(body);

    server.send_to(id.0, reply)
}

/// Send an error reply for a bus call, unless the caller asked for no
/// reply.
pub(super) fn error_reply(
    server: &mut Server,
    id: RemoteId,
    request: &Message<'_>,
    name: &str,
    text: &str,
) -> Result<()> {
    if request.flags() & Flags::NO_REPLY_EXPECTED {
        return Ok(());
    }

    let mut body = BodyBuf::new();
    body.store(text)?;

    let reply = request
        .error(name, server.next_serial())
        .with_sender(fdo::DESTINATION)
        .with_body(&body);

    server.send_to(id.0, reply)
}

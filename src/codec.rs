//! Binary wire codec for the control-plane protocol.
//!
//! Five message kinds share a one-byte type tag; every integer field is a
//! big-endian 32-bit signed value unless noted. Decoding is total: malformed
//! input yields [`CodecError`], never a panic, and a declared record count
//! that would run past the end of the datagram is rejected before any
//! record is read.

use nom::bytes::complete::take_until;
use nom::number::complete::{be_i32, be_u8, be_u16};
use serde::Serialize;

use crate::error::CodecError;

/// Maximum UDP datagram size this protocol ever produces or accepts.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

const TAG_REGISTER_REQUEST: u8 = 1;
const TAG_REGISTER_RESPONSE: u8 = 2;
const TAG_ROUTING_UPDATE: u8 = 3;
const TAG_KEEP_ALIVE: u8 = 4;
const TAG_TOPOLOGY_UPDATE: u8 = 5;

/// One neighbor entry inside a `REGISTER_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborAnnouncement {
    pub id: i32,
    pub alive: bool,
    pub port: i32,
    pub host: String,
}

/// One row of a `ROUTING_UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingEntry {
    pub src: i32,
    pub dest: i32,
    pub next_hop: i32,
    pub distance: i32,
}

/// One neighbor-liveness bit inside a `TOPOLOGY_UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeighborReport {
    pub neighbor_id: i32,
    pub alive: bool,
}

/// A decoded (or to-be-encoded) protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Message {
    RegisterRequest {
        switch_id: i32,
        announced_port: i32,
    },
    RegisterResponse {
        neighbors: Vec<NeighborAnnouncement>,
    },
    RoutingUpdate {
        routes: Vec<RoutingEntry>,
    },
    KeepAlive {
        switch_id: i32,
    },
    TopologyUpdate {
        switch_id: i32,
        neighbors: Vec<NeighborReport>,
    },
}

impl Message {
    pub fn tag(&self) -> u8 {
        match self {
            Message::RegisterRequest { .. } => TAG_REGISTER_REQUEST,
            Message::RegisterResponse { .. } => TAG_REGISTER_RESPONSE,
            Message::RoutingUpdate { .. } => TAG_ROUTING_UPDATE,
            Message::KeepAlive { .. } => TAG_KEEP_ALIVE,
            Message::TopologyUpdate { .. } => TAG_TOPOLOGY_UPDATE,
        }
    }

    /// Serialize to the wire format. Never fails: every in-memory value is
    /// representable (string hosts carry no embedded NUL by construction,
    /// since they come from `SocketAddr::ip().to_string()`).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.tag());
        match self {
            Message::RegisterRequest {
                switch_id,
                announced_port,
            } => {
                buf.extend_from_slice(&switch_id.to_be_bytes());
                buf.extend_from_slice(&announced_port.to_be_bytes());
            }
            Message::RegisterResponse { neighbors } => {
                buf.extend_from_slice(&(neighbors.len() as u16).to_be_bytes());
                for nbr in neighbors {
                    buf.extend_from_slice(&nbr.id.to_be_bytes());
                    buf.push(nbr.alive as u8);
                    buf.extend_from_slice(&nbr.port.to_be_bytes());
                    buf.extend_from_slice(nbr.host.as_bytes());
                    buf.push(0);
                }
            }
            Message::RoutingUpdate { routes } => {
                buf.extend_from_slice(&(routes.len() as u16).to_be_bytes());
                for r in routes {
                    buf.extend_from_slice(&r.src.to_be_bytes());
                    buf.extend_from_slice(&r.dest.to_be_bytes());
                    buf.extend_from_slice(&r.next_hop.to_be_bytes());
                    buf.extend_from_slice(&r.distance.to_be_bytes());
                }
            }
            Message::KeepAlive { switch_id } => {
                buf.extend_from_slice(&switch_id.to_be_bytes());
            }
            Message::TopologyUpdate {
                switch_id,
                neighbors,
            } => {
                buf.extend_from_slice(&switch_id.to_be_bytes());
                buf.extend_from_slice(&(neighbors.len() as u16).to_be_bytes());
                for nbr in neighbors {
                    buf.extend_from_slice(&nbr.neighbor_id.to_be_bytes());
                    buf.push(nbr.alive as u8);
                }
            }
        }
        buf
    }

    /// Parse a datagram. Rejects anything over [`MAX_DATAGRAM_SIZE`] up
    /// front, then dispatches on the leading tag byte.
    pub fn decode(input: &[u8]) -> Result<Message, CodecError> {
        if input.len() > MAX_DATAGRAM_SIZE {
            return Err(CodecError::DatagramTooLarge { len: input.len() });
        }
        let (tag, rest) = take_u8_field(input, "type tag")?;
        match tag {
            TAG_REGISTER_REQUEST => decode_register_request(rest),
            TAG_REGISTER_RESPONSE => decode_register_response(rest),
            TAG_ROUTING_UPDATE => decode_routing_update(rest),
            TAG_KEEP_ALIVE => decode_keep_alive(rest),
            TAG_TOPOLOGY_UPDATE => decode_topology_update(rest),
            other => Err(CodecError::BadTag(other)),
        }
    }
}

fn take_i32_field<'a>(input: &'a [u8], context: &'static str) -> Result<(i32, &'a [u8]), CodecError> {
    be_i32::<_, nom::error::Error<&[u8]>>(input)
        .map(|(rest, v)| (v, rest))
        .map_err(|_| CodecError::Truncated { context })
}

fn take_u16_field<'a>(input: &'a [u8], context: &'static str) -> Result<(u16, &'a [u8]), CodecError> {
    be_u16::<_, nom::error::Error<&[u8]>>(input)
        .map(|(rest, v)| (v, rest))
        .map_err(|_| CodecError::Truncated { context })
}

fn take_u8_field<'a>(input: &'a [u8], context: &'static str) -> Result<(u8, &'a [u8]), CodecError> {
    be_u8::<_, nom::error::Error<&[u8]>>(input)
        .map(|(rest, v)| (v, rest))
        .map_err(|_| CodecError::Truncated { context })
}

fn take_host(input: &[u8]) -> Result<(String, &[u8]), CodecError> {
    let (rest, host_bytes) = take_until::<_, _, nom::error::Error<&[u8]>>(&b"\0"[..])(input)
        .map_err(|_| CodecError::UnterminatedHost)?;
    let host = String::from_utf8_lossy(host_bytes).into_owned();
    // `take_until` leaves the delimiter itself in `rest`; skip the NUL.
    Ok((host, &rest[1..]))
}

fn decode_register_request(input: &[u8]) -> Result<Message, CodecError> {
    let (switch_id, rest) = take_i32_field(input, "REGISTER_REQUEST switch_id")?;
    let (announced_port, _rest) = take_i32_field(rest, "REGISTER_REQUEST announced_port")?;
    Ok(Message::RegisterRequest {
        switch_id,
        announced_port,
    })
}

fn decode_register_response(input: &[u8]) -> Result<Message, CodecError> {
    let (count, mut rest) = take_u16_field(input, "REGISTER_RESPONSE count")?;
    // Minimum per-record size: 4B id + 1B alive + 4B port + 1B NUL terminator.
    const MIN_RECORD_SIZE: usize = 10;
    check_budget(count as usize, MIN_RECORD_SIZE, rest.len())?;
    let mut neighbors = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (id, r) = take_i32_field(rest, "REGISTER_RESPONSE neighbor id")?;
        let (alive, r) = take_u8_field(r, "REGISTER_RESPONSE neighbor alive")?;
        let (port, r) = take_i32_field(r, "REGISTER_RESPONSE neighbor port")?;
        let (host, r) = take_host(r)?;
        neighbors.push(NeighborAnnouncement {
            id,
            alive: alive != 0,
            port,
            host,
        });
        rest = r;
    }
    Ok(Message::RegisterResponse { neighbors })
}

fn decode_routing_update(input: &[u8]) -> Result<Message, CodecError> {
    let (count, mut rest) = take_u16_field(input, "ROUTING_UPDATE count")?;
    const RECORD_SIZE: usize = 16;
    check_budget(count as usize, RECORD_SIZE, rest.len())?;
    let mut routes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (src, r) = take_i32_field(rest, "ROUTING_UPDATE src")?;
        let (dest, r) = take_i32_field(r, "ROUTING_UPDATE dest")?;
        let (next_hop, r) = take_i32_field(r, "ROUTING_UPDATE next_hop")?;
        let (distance, r) = take_i32_field(r, "ROUTING_UPDATE distance")?;
        routes.push(RoutingEntry {
            src,
            dest,
            next_hop,
            distance,
        });
        rest = r;
    }
    Ok(Message::RoutingUpdate { routes })
}

fn decode_keep_alive(input: &[u8]) -> Result<Message, CodecError> {
    let (switch_id, _rest) = take_i32_field(input, "KEEP_ALIVE switch_id")?;
    Ok(Message::KeepAlive { switch_id })
}

fn decode_topology_update(input: &[u8]) -> Result<Message, CodecError> {
    let (switch_id, rest) = take_i32_field(input, "TOPOLOGY_UPDATE switch_id")?;
    let (count, mut rest) = take_u16_field(rest, "TOPOLOGY_UPDATE count")?;
    const RECORD_SIZE: usize = 5;
    check_budget(count as usize, RECORD_SIZE, rest.len())?;
    let mut neighbors = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (neighbor_id, r) = take_i32_field(rest, "TOPOLOGY_UPDATE neighbor id")?;
        let (alive, r) = take_u8_field(r, "TOPOLOGY_UPDATE neighbor alive")?;
        neighbors.push(NeighborReport {
            neighbor_id,
            alive: alive != 0,
        });
        rest = r;
    }
    Ok(Message::TopologyUpdate {
        switch_id,
        neighbors,
    })
}

fn check_budget(count: usize, min_record_size: usize, remaining: usize) -> Result<(), CodecError> {
    match count.checked_mul(min_record_size) {
        Some(needed) if needed <= remaining => Ok(()),
        _ => Err(CodecError::CountExceedsBudget {
            declared: count,
            remaining,
        }),
    }
}

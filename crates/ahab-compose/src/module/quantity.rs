//! Parsers for port specs and resource quantities, built on `nom`.
//!
//! Module specs carry these values as free-form strings. They are kept
//! verbatim in the manifest; parsing only proves they are well formed and
//! extracts the pieces the generator needs (the container port).

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{preceded, terminated},
};

/// A parsed docker-compose port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// The spec exactly as written in the module.
    pub raw: String,
    /// Host interface the port is bound to, if any.
    pub host_ip: Option<String>,
    /// Published host port, if any.
    pub host: Option<u16>,
    /// Port the service listens on inside the container.
    pub container: u16,
    /// Transport protocol suffix, if any.
    pub protocol: Option<String>,
}

fn port_number(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |digits: &str| digits.parse::<u16>()).parse(input)
}

fn ipv4(input: &str) -> IResult<&str, &str> {
    recognize((
        digit1,
        char('.'),
        digit1,
        char('.'),
        digit1,
        char('.'),
        digit1,
    ))
    .parse(input)
}

fn protocol(input: &str) -> IResult<&str, &str> {
    preceded(
        char('/'),
        alt((tag_no_case("tcp"), tag_no_case("udp"), tag_no_case("sctp"))),
    )
    .parse(input)
}

type RawPort<'a> = (Option<&'a str>, u16, Option<u16>, Option<&'a str>);

fn port_mapping(input: &str) -> IResult<&str, RawPort<'_>> {
    (
        opt(terminated(ipv4, char(':'))),
        port_number,
        opt(preceded(char(':'), port_number)),
        opt(protocol),
    )
        .parse(input)
}

/// Parses `[ip:][host:]container[/proto]`.
///
/// # Errors
///
/// Returns a description of the problem if the spec is malformed, names
/// port 0, or binds an interface without a host port.
pub fn parse_port(input: &str) -> Result<PortSpec, String> {
    let trimmed = input.trim();
    let (_, (host_ip, first, second, proto)) = all_consuming(port_mapping)
        .parse(trimmed)
        .map_err(|_| format!("malformed port spec \"{input}\""))?;

    let (host, container) = match second {
        Some(container) => (Some(first), container),
        None if host_ip.is_some() => {
            return Err(format!(
                "port spec \"{input}\" binds an interface without a host port"
            ));
        }
        None => (None, first),
    };

    if container == 0 || host == Some(0) {
        return Err(format!("port spec \"{input}\" uses port 0"));
    }

    Ok(PortSpec {
        raw: trimmed.to_string(),
        host_ip: host_ip.map(str::to_string),
        host,
        container,
        protocol: proto.map(str::to_ascii_lowercase),
    })
}

fn memory_unit(input: &str) -> IResult<&str, &str> {
    alt((
        tag_no_case("kb"),
        tag_no_case("mb"),
        tag_no_case("gb"),
        tag_no_case("k"),
        tag_no_case("m"),
        tag_no_case("g"),
        tag_no_case("b"),
    ))
    .parse(input)
}

/// Parses a compose memory quantity (`512M`, `1g`, `256mb`, `1048576`)
/// into bytes.
///
/// # Errors
///
/// Returns a description of the problem if the quantity is malformed,
/// zero, or overflows.
pub fn parse_memory(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let (_, (digits, unit)) = all_consuming((digit1, opt(memory_unit)))
        .parse(trimmed)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| {
            format!("malformed memory quantity \"{input}\"")
        })?;

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("memory quantity \"{input}\" is out of range"))?;
    let multiplier: u64 = match unit.map(|u| u.to_ascii_lowercase()).as_deref() {
        None | Some("b") => 1,
        Some("k" | "kb") => 1 << 10,
        Some("m" | "mb") => 1 << 20,
        _ => 1 << 30,
    };

    let bytes = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("memory quantity \"{input}\" is out of range"))?;
    if bytes == 0 {
        return Err(format!("memory quantity \"{input}\" must be positive"));
    }
    Ok(bytes)
}

/// Parses a compose CPU quantity (`0.5`, `2`).
///
/// # Errors
///
/// Returns a description of the problem if the quantity is malformed or
/// not positive.
pub fn parse_cpus(input: &str) -> Result<f64, String> {
    let trimmed = input.trim();
    let (_, text) = all_consuming(recognize((digit1, opt((char('.'), digit1)))))
        .parse(trimmed)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| {
            format!("malformed cpu quantity \"{input}\"")
        })?;

    let cpus: f64 = text
        .parse()
        .map_err(|_| format!("malformed cpu quantity \"{input}\""))?;
    if cpus <= 0.0 {
        return Err(format!("cpu quantity \"{input}\" must be positive"));
    }
    Ok(cpus)
}

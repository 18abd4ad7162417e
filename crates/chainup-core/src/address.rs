use crate::error::AddressError;

pub const PARAMETERIZED_ADDRESS_SCHEME: &str = "orch";

/// Extracts the base address from a parameterized address such as
/// `orch:/agoric1abc/sub/account?k=v`.
pub fn extract_base_address(full_addr: &str) -> Result<String, AddressError> {
    extract_base_address_from_urn(full_addr, PARAMETERIZED_ADDRESS_SCHEME)
}

/// Extracts the first path segment of `relative_urn` resolved against
/// `scheme:`. A reference without a scheme is taken as relative.
pub fn extract_base_address_from_urn(
    relative_urn: &str,
    scheme: &str,
) -> Result<String, AddressError> {
    let reference = UriReference::parse(relative_urn)?;

    let resolved_scheme = reference.scheme.as_deref().unwrap_or(scheme);
    if resolved_scheme != scheme {
        return Err(AddressError::UnsupportedScheme(resolved_scheme.to_string()));
    }

    let path = reference.resolved_path()?;
    let mut splits = path.splitn(3, '/');
    let leading = splits.next().unwrap_or_default();
    let Some(base) = splits.next() else {
        return Err(AddressError::MissingLeadingSlash(path.clone()));
    };
    if !leading.is_empty() {
        return Err(AddressError::MissingLeadingSlash(path.clone()));
    }
    if base.is_empty() {
        return Err(AddressError::EmptyBase);
    }

    Ok(base.to_string())
}

#[derive(Debug)]
struct UriReference<'a> {
    scheme: Option<String>,
    // escaped path, empty for opaque references
    path: &'a str,
}

impl<'a> UriReference<'a> {
    fn parse(raw: &'a str) -> Result<Self, AddressError> {
        if raw.bytes().any(|b| b < 0x20 || b == 0x7f) {
            return Err(invalid("invalid control character in URL"));
        }

        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (raw, None),
        };
        if let Some(fragment) = fragment {
            percent_decode(fragment)?;
        }

        let (scheme, rest) = split_scheme(rest)?;
        let rest = rest.split_once('?').map_or(rest, |(path, _query)| path);

        if !rest.starts_with('/') {
            if scheme.is_some() {
                return Ok(Self { scheme, path: "" });
            }
            let first_segment = rest.split('/').next().unwrap_or_default();
            if first_segment.contains(':') {
                return Err(invalid("first path segment in URL cannot contain colon"));
            }
        }

        let path = if rest.starts_with("//") && (scheme.is_some() || !rest.starts_with("///")) {
            let after = &rest[2..];
            let (authority, path) = match after.find('/') {
                Some(index) => after.split_at(index),
                None => (after, ""),
            };
            validate_authority(authority)?;
            path
        } else {
            rest
        };
        percent_decode(path)?;

        Ok(Self { scheme, path })
    }

    fn resolved_path(&self) -> Result<String, AddressError> {
        if self.path.is_empty() {
            return Ok(String::new());
        }
        percent_decode(&remove_dot_segments(self.path))
    }
}

fn invalid(reason: &str) -> AddressError {
    AddressError::InvalidUrl(reason.to_string())
}

fn split_scheme(raw: &str) -> Result<(Option<String>, &str), AddressError> {
    for (index, ch) in raw.char_indices() {
        match ch {
            'a'..='z' | 'A'..='Z' => {}
            '0'..='9' | '+' | '-' | '.' => {
                if index == 0 {
                    return Ok((None, raw));
                }
            }
            ':' => {
                if index == 0 {
                    return Err(invalid("missing protocol scheme"));
                }
                return Ok((
                    Some(raw[..index].to_ascii_lowercase()),
                    &raw[index + 1..],
                ));
            }
            _ => return Ok((None, raw)),
        }
    }
    Ok((None, raw))
}

fn validate_authority(authority: &str) -> Result<(), AddressError> {
    let (userinfo, host) = match authority.rsplit_once('@') {
        Some((userinfo, host)) => (Some(userinfo), host),
        None => (None, authority),
    };
    validate_host(host)?;

    if let Some(userinfo) = userinfo {
        if !userinfo.bytes().all(is_userinfo_byte) {
            return Err(invalid("invalid userinfo"));
        }
        percent_decode(userinfo)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostPart {
    Host,
    // IPv6 zone identifier, introduced by `%25`
    Zone,
}

fn validate_host(host: &str) -> Result<(), AddressError> {
    if host.starts_with('[') {
        let Some(close) = host.rfind(']') else {
            return Err(invalid("missing ']' in host"));
        };
        validate_port(&host[close + 1..])?;
        if let Some(zone) = host[..close].find("%25") {
            validate_host_part(&host[..zone], HostPart::Host)?;
            validate_host_part(&host[zone..close], HostPart::Zone)?;
            return validate_host_part(&host[close..], HostPart::Host);
        }
    } else if let Some(index) = host.rfind(':') {
        validate_port(&host[index..])?;
    }
    validate_host_part(host, HostPart::Host)
}

fn validate_port(colon_port: &str) -> Result<(), AddressError> {
    if colon_port.is_empty() {
        return Ok(());
    }
    match colon_port.strip_prefix(':') {
        Some(digits) if digits.bytes().all(|b| b.is_ascii_digit()) => Ok(()),
        _ => Err(AddressError::InvalidUrl(format!(
            "invalid port {colon_port:?} after host"
        ))),
    }
}

/// Hosts may only percent-encode non-ASCII bytes, except `%25` which
/// introduces a zone.
fn validate_host_part(part: &str, kind: HostPart) -> Result<(), AddressError> {
    let bytes = part.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if byte != b'%' {
            if byte < 0x80 && host_byte_needs_escape(byte) {
                return Err(AddressError::InvalidUrl(format!(
                    "invalid character {:?} in host name",
                    char::from(byte)
                )));
            }
            index += 1;
            continue;
        }

        let escape = &bytes[index..(index + 3).min(bytes.len())];
        let hi = escape.get(1).and_then(|b| hex_value(*b));
        let lo = escape.get(2).and_then(|b| hex_value(*b));
        let (Some(hi), Some(lo)) = (hi, lo) else {
            return Err(invalid_escape(escape));
        };
        let rejected = match kind {
            HostPart::Host => hi < 8 && escape != b"%25",
            HostPart::Zone => {
                let value = hi << 4 | lo;
                escape != b"%25" && value != b' ' && host_byte_needs_escape(value)
            }
        };
        if rejected {
            return Err(invalid_escape(escape));
        }
        index += 3;
    }
    Ok(())
}

fn host_byte_needs_escape(byte: u8) -> bool {
    !matches!(
        byte,
        b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b':'
            | b'['
            | b']'
            | b'<'
            | b'>'
            | b'"'
    )
}

fn is_userinfo_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b':'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b'%'
            | b'@'
    )
}

fn remove_dot_segments(path: &str) -> String {
    let elements: Vec<&str> = path.split('/').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(elements.len());
    for element in &elements {
        match *element {
            "." => {}
            ".." => {
                kept.pop();
            }
            other => kept.push(other),
        }
    }

    let mut resolved = format!("/{}", kept.join("/"));
    if matches!(elements.last(), Some(&".") | Some(&"..")) {
        resolved.push('/');
    }
    if resolved.starts_with("//") {
        resolved.remove(0);
    }
    resolved
}

fn percent_decode(escaped: &str) -> Result<String, AddressError> {
    let bytes = escaped.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] != b'%' {
            decoded.push(bytes[index]);
            index += 1;
            continue;
        }

        let hi = bytes.get(index + 1).and_then(|b| hex_value(*b));
        let lo = bytes.get(index + 2).and_then(|b| hex_value(*b));
        let (Some(hi), Some(lo)) = (hi, lo) else {
            return Err(invalid_escape(&bytes[index..(index + 3).min(bytes.len())]));
        };
        decoded.push(hi << 4 | lo);
        index += 3;
    }
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

fn invalid_escape(escape: &[u8]) -> AddressError {
    AddressError::InvalidUrl(format!(
        "invalid URL escape {:?}",
        String::from_utf8_lossy(escape)
    ))
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

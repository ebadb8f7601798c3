//! Common types used in the protocol.

use crate::constants::*;
use crate::error::{CredentialField, EncodingError};

/// Function code carried after the credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Read the listed parameters.
    Read,
    /// Write the listed parameters.
    Write,
    /// Reply from the unit.
    Response,
    /// Any other function byte.
    Other(u8),
}

impl From<u8> for Function {
    fn from(code: u8) -> Self {
        match code {
            FUNC_READ => Function::Read,
            FUNC_WRITE => Function::Write,
            FUNC_RESPONSE => Function::Response,
            _ => Function::Other(code),
        }
    }
}

impl From<Function> for u8 {
    fn from(function: Function) -> Self {
        match function {
            Function::Read => FUNC_READ,
            Function::Write => FUNC_WRITE,
            Function::Response => FUNC_RESPONSE,
            Function::Other(code) => code,
        }
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Read => write!(f, "READ"),
            Function::Write => write!(f, "WRITE"),
            Function::Response => write!(f, "RESPONSE"),
            Function::Other(code) => write!(f, "0x{:02X}", code),
        }
    }
}

/// Device id and password sent with every command.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    device_id: Vec<u8>,
    password: Vec<u8>,
}

impl Credentials {
    /// Create credentials, rejecting fields that do not fit a one-byte
    /// length prefix.
    pub fn new(
        device_id: impl Into<Vec<u8>>,
        password: impl Into<Vec<u8>>,
    ) -> Result<Self, EncodingError> {
        let device_id = device_id.into();
        let password = password.into();
        check_credential_len(CredentialField::DeviceId, &device_id)?;
        check_credential_len(CredentialField::Password, &password)?;
        Ok(Credentials {
            device_id,
            password,
        })
    }

    /// The device identifier bytes.
    pub fn device_id(&self) -> &[u8] {
        &self.device_id
    }

    /// The password bytes.
    pub fn password(&self) -> &[u8] {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &String::from_utf8_lossy(&self.device_id))
            .field("password", &"<redacted>")
            .finish()
    }
}

pub(crate) fn check_credential_len(
    field: CredentialField,
    value: &[u8],
) -> Result<(), EncodingError> {
    if value.len() > MAX_CREDENTIAL_LEN {
        return Err(EncodingError::CredentialTooLong {
            field,
            max: MAX_CREDENTIAL_LEN,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Ordered parameter id to value mapping.
///
/// Iteration follows first insertion; setting an id that is already present
/// replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterList {
    entries: Vec<(u8, u8)>,
}

impl ParameterList {
    /// Create an empty list.
    pub fn new() -> Self {
        ParameterList::default()
    }

    /// Set a parameter.
    ///
    /// Ids and values wider than a byte are masked to their low 8 bits.
    /// This wraparound is intentional: `0x1B7` lands on `0xB7` and a value of
    /// `256` is sent as `0`.
    pub fn set(&mut self, id: impl Into<u32>, value: impl Into<u32>) {
        let id = (id.into() & 0xFF) as u8;
        let value = (value.into() & 0xFF) as u8;
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    /// Builder form of [`ParameterList::set`].
    pub fn with(mut self, id: impl Into<u32>, value: impl Into<u32>) -> Self {
        self.set(id, value);
        self
    }

    /// Look up a parameter value.
    pub fn get(&self, id: u8) -> Option<u8> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, value)| *value)
    }

    /// Iterate `(id, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: Into<u32>, V: Into<u32>> FromIterator<(I, V)> for ParameterList {
    fn from_iter<T: IntoIterator<Item = (I, V)>>(iter: T) -> Self {
        let mut list = ParameterList::new();
        for (id, value) in iter {
            list.set(id, value);
        }
        list
    }
}

/// A function code plus the parameters it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Function code.
    pub function: Function,
    /// Parameters in wire order.
    pub params: ParameterList,
}

impl CommandRequest {
    /// Create a request.
    pub fn new(function: Function, params: ParameterList) -> Self {
        CommandRequest { function, params }
    }

    /// Read the given parameter ids, sending zero placeholders.
    pub fn read(ids: &[u8]) -> Self {
        let params = ids.iter().map(|&id| (id, 0u8)).collect();
        CommandRequest::new(Function::Read, params)
    }

    /// Write the given parameters.
    pub fn write(params: ParameterList) -> Self {
        CommandRequest::new(Function::Write, params)
    }

    /// Encode this request into a wire packet.
    pub fn encode(&self, credentials: &Credentials) -> Vec<u8> {
        crate::packet::build_packet(
            self.function.into(),
            &self.params,
            credentials.device_id(),
            credentials.password(),
        )
    }
}

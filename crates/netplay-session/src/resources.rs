//! String-keyed settings store shared with the settings front-ends.
//!
//! Front-ends write the resources first and then issue a command without
//! arguments; the command reads its inputs back from here.

use netplay_types::{ControlChannel, ControlMask, Side};

use crate::config::NetplayConfig;
use crate::error::ResourceError;
use crate::validate::validate_port;

pub const SERVER_NAME: &str = "NetworkServerName";
pub const SERVER_BIND_ADDRESS: &str = "NetworkServerBindAddress";
pub const SERVER_PORT: &str = "NetworkServerPort";
pub const CONTROL: &str = "NetworkControl";

/// Get/set access to named integer and string settings.
pub trait ResourceStore: Send {
    fn get_int(&self, name: &str) -> Result<i64, ResourceError>;

    fn set_int(&mut self, name: &str, value: i64) -> Result<(), ResourceError>;

    fn get_string(&self, name: &str) -> Result<String, ResourceError>;

    fn set_string(&mut self, name: &str, value: &str) -> Result<(), ResourceError>;
}

/// In-memory store holding the four netplay resources.
#[derive(Debug, Clone)]
pub struct NetplayResources {
    server_name: String,
    bind_address: String,
    port: u16,
    control: ControlMask,
}

impl NetplayResources {
    pub fn from_config(config: &NetplayConfig) -> Self {
        Self {
            server_name: config.server_name.clone(),
            bind_address: config.bind_address.clone(),
            port: config.port,
            control: with_server_resources(ControlMask(config.control)),
        }
    }

    pub fn control(&self) -> ControlMask {
        self.control
    }
}

impl Default for NetplayResources {
    fn default() -> Self {
        Self::from_config(&NetplayConfig::default())
    }
}

/// The server never gives up control of resources.
fn with_server_resources(mask: ControlMask) -> ControlMask {
    mask.with(ControlChannel::Resources, Side::Server, true)
}

impl ResourceStore for NetplayResources {
    fn get_int(&self, name: &str) -> Result<i64, ResourceError> {
        match name {
            SERVER_PORT => Ok(i64::from(self.port)),
            CONTROL => Ok(i64::from(self.control.0)),
            SERVER_NAME | SERVER_BIND_ADDRESS => Err(ResourceError::WrongType(name.to_string())),
            _ => Err(ResourceError::Unknown(name.to_string())),
        }
    }

    fn set_int(&mut self, name: &str, value: i64) -> Result<(), ResourceError> {
        match name {
            SERVER_PORT => {
                self.port = validate_port(value).map_err(|e| ResourceError::InvalidValue {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(())
            }
            CONTROL => {
                let raw = u16::try_from(value).map_err(|_| ResourceError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("{value} does not fit in 16 bits"),
                })?;
                self.control = with_server_resources(ControlMask(raw));
                Ok(())
            }
            SERVER_NAME | SERVER_BIND_ADDRESS => Err(ResourceError::WrongType(name.to_string())),
            _ => Err(ResourceError::Unknown(name.to_string())),
        }
    }

    fn get_string(&self, name: &str) -> Result<String, ResourceError> {
        match name {
            SERVER_NAME => Ok(self.server_name.clone()),
            SERVER_BIND_ADDRESS => Ok(self.bind_address.clone()),
            SERVER_PORT | CONTROL => Err(ResourceError::WrongType(name.to_string())),
            _ => Err(ResourceError::Unknown(name.to_string())),
        }
    }

    fn set_string(&mut self, name: &str, value: &str) -> Result<(), ResourceError> {
        match name {
            SERVER_NAME => value.clone_into(&mut self.server_name),
            SERVER_BIND_ADDRESS => value.clone_into(&mut self.bind_address),
            SERVER_PORT | CONTROL => return Err(ResourceError::WrongType(name.to_string())),
            _ => return Err(ResourceError::Unknown(name.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let res = NetplayResources::default();
        assert_eq!(res.get_string(SERVER_NAME).unwrap(), "127.0.0.1");
        assert_eq!(res.get_string(SERVER_BIND_ADDRESS).unwrap(), "");
        assert_eq!(res.get_int(SERVER_PORT).unwrap(), 6502);
        assert_eq!(res.get_int(CONTROL).unwrap(), 0x031d);
    }

    #[test]
    fn port_range_is_enforced() {
        let mut res = NetplayResources::default();
        assert!(res.set_int(SERVER_PORT, 0).is_err());
        assert!(res.set_int(SERVER_PORT, 65536).is_err());
        assert_eq!(res.get_int(SERVER_PORT).unwrap(), 6502);
        res.set_int(SERVER_PORT, 1).unwrap();
        assert_eq!(res.get_int(SERVER_PORT).unwrap(), 1);
        res.set_int(SERVER_PORT, 65535).unwrap();
        assert_eq!(res.get_int(SERVER_PORT).unwrap(), 65535);
    }

    #[test]
    fn control_keeps_server_resources_bit() {
        let mut res = NetplayResources::default();
        res.set_int(CONTROL, 0).unwrap();
        assert_eq!(res.get_int(CONTROL).unwrap(), 0x0010);
        assert!(res.set_int(CONTROL, 0x1_0000).is_err());
    }

    #[test]
    fn unknown_and_mistyped_keys() {
        let mut res = NetplayResources::default();
        assert_eq!(
            res.get_int("NetworkBogus"),
            Err(ResourceError::Unknown("NetworkBogus".to_string()))
        );
        assert_eq!(
            res.get_int(SERVER_NAME),
            Err(ResourceError::WrongType(SERVER_NAME.to_string()))
        );
        assert_eq!(
            res.set_string(SERVER_PORT, "6502"),
            Err(ResourceError::WrongType(SERVER_PORT.to_string()))
        );
        res.set_string(SERVER_NAME, "10.0.0.5").unwrap();
        assert_eq!(res.get_string(SERVER_NAME).unwrap(), "10.0.0.5");
    }
}

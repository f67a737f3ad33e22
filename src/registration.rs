//! Endpoint Registration
//!
//! Properties sent once at startup with `org.bluez.Media1.RegisterEndpoint`
//! on the adapter. They advertise the unicast sink role, the LC3 codec and
//! the PAC capability records of the configured profile.

use crate::constants::{
    BLUEZ_SERVICE, LC3_CODEC_ID, MEDIA_ENDPOINT_INTERFACE, MEDIA_INTERFACE, PAC_SINK_UUID,
};
use crate::lc3::{Lc3Capabilities, LtvBuffer, encode_capabilities};
use crate::transport::ObjectPath;
use crate::{EndpointError, EndpointOptions};

/// `RegisterEndpoint(o, a{sv})` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationProperties {
    /// Bus name the call is sent to
    pub destination: &'static str,
    /// Interface of the call (`org.bluez.Media1`)
    pub interface: &'static str,
    /// Interface the caller must export at `endpoint_path`
    pub endpoint_interface: &'static str,
    /// Adapter the call is made on
    pub adapter_path: ObjectPath,
    /// Endpoint object path (first argument)
    pub endpoint_path: ObjectPath,
    /// `UUID` property
    pub uuid: &'static str,
    /// `Codec` property
    pub codec: u8,
    /// `Capabilities` property, PAC LTV records
    pub capabilities: LtvBuffer,
}

/// Build the registration properties for an endpoint
///
/// # Errors
/// Returns error if a path is not a valid object path or the profile cannot
/// be advertised
pub fn registration_properties(
    options: &EndpointOptions,
) -> Result<RegistrationProperties, EndpointError> {
    let capabilities = encode_capabilities(&Lc3Capabilities::for_profile(&options.profile))?;
    let properties = RegistrationProperties {
        destination: BLUEZ_SERVICE,
        interface: MEDIA_INTERFACE,
        endpoint_interface: MEDIA_ENDPOINT_INTERFACE,
        adapter_path: ObjectPath::try_from(options.adapter_path)?,
        endpoint_path: ObjectPath::try_from(options.endpoint_path)?,
        uuid: PAC_SINK_UUID,
        codec: LC3_CODEC_ID,
        capabilities,
    };

    debug!(
        "[REGISTRATION] {} on {}: {} capability bytes",
        properties.endpoint_path.as_str(),
        properties.adapter_path.as_str(),
        properties.capabilities.len()
    );
    Ok(properties)
}

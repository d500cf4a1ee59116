//! Modem state facets and their ordering invariants
//!
//! `registered` implies `initialized`, an open context implies `registered`. The setters
//! refuse to break the ordering and clearing a facet clears everything depending on it.

/// Kind of the active network session. The module supports one at a time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionKind {
    /// No session
    #[default]
    None,

    /// GPRS bearer (`AT+SAPBR`) used by the HTTP client
    BearerHttp,

    /// IP context (`AT+CSTT`/`AT+CIICR`) used by raw TCP connections
    RawTcp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemState {
    powered: bool,
    initialized: bool,
    session: SessionKind,

    /// HTTP context under [SessionKind::BearerHttp], transparent connection under [SessionKind::RawTcp]
    context_open: bool,
}

impl ModemState {
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True if a bearer or an IP context is up
    pub fn is_registered(&self) -> bool {
        self.session != SessionKind::None
    }

    pub fn session(&self) -> SessionKind {
        self.session
    }

    pub fn is_http_open(&self) -> bool {
        self.context_open && self.session == SessionKind::BearerHttp
    }

    pub fn is_stream_active(&self) -> bool {
        self.context_open && self.session == SessionKind::RawTcp
    }

    /// Powering off clears all other facets
    pub(crate) fn set_powered(&mut self, powered: bool) {
        if !powered {
            *self = Self::default();
            return;
        }

        self.powered = true;
    }

    /// Only valid after a successful AT exchange
    pub(crate) fn set_initialized(&mut self) {
        self.initialized = true;
    }

    pub(crate) fn clear_initialized(&mut self) {
        self.initialized = false;
        self.clear_session();
    }

    /// Returns false and leaves the state untouched if not initialized
    pub(crate) fn set_session(&mut self, session: SessionKind) -> bool {
        if !self.initialized {
            return false;
        }

        if session != self.session {
            self.context_open = false;
        }

        self.session = session;
        true
    }

    pub(crate) fn clear_session(&mut self) {
        self.session = SessionKind::None;
        self.context_open = false;
    }

    /// Returns false and leaves the state untouched if not registered
    pub(crate) fn set_context_open(&mut self) -> bool {
        if !self.is_registered() {
            return false;
        }

        self.context_open = true;
        true
    }

    pub(crate) fn clear_context_open(&mut self) {
        self.context_open = false;
    }
}

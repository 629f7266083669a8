use rand::Rng;

// -----------------------------------------------------------------------------
// ----- SessionToken ----------------------------------------------------------

/// Fresh session identifiers for browsers that arrive without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

// -----------------------------------------------------------------------------
// ----- SessionToken: Static --------------------------------------------------

impl SessionToken {
    /// 128 random bits, lowercase hex.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        SessionToken(format!("{:032x}", rng.random::<u128>()))
    }
}

impl SessionToken {
    pub fn into_string(self) -> String {
        self.0
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

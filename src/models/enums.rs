use crate::db::codec::DecodeError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DecodeError::InvalidField {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Administrator => "administrator",
    Doctor => "doctor",
    Patient => "patient",
    Pharmacist => "pharmacist",
});

str_enum!(AppointmentStatus {
    Pending => "Pending",
    Scheduled => "Scheduled",
    Rescheduled => "Rescheduled",
    Cancelled => "Cancelled",
    Declined => "Declined",
    Completed => "Completed",
});

str_enum!(PrescriptionStatus {
    Pending => "pending",
    Dispensed => "dispensed",
});

impl AppointmentStatus {
    /// An active appointment occupies its slot for availability purposes.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled | Self::Rescheduled)
    }
}

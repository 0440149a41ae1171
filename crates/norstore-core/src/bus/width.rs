//! QSPI bus widths
//!
//! Width is set per phase combination, not per wire: the peripheral's WIDTH
//! field names fixed command/address/data combinations, conventionally
//! written "1-1-1" through "4-4-4".

/// Per-phase wire-width combination for a QSPI transfer
///
/// Discriminants match the peripheral's INSTRFRAME WIDTH field encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BusWidth {
    /// Standard SPI: 1-1-1 (cmd, addr, data all on a single line)
    #[default]
    Single = 0,
    /// Dual Output: 1-1-2 (data phase on 2 lines)
    DualOut = 1,
    /// Quad Output: 1-1-4 (data phase on 4 lines)
    QuadOut = 2,
    /// Dual I/O: 1-2-2 (addr and data on 2 lines)
    DualIo = 3,
    /// Quad I/O: 1-4-4 (addr and data on 4 lines)
    QuadIo = 4,
    /// Dual command: 2-2-2 (everything on 2 lines)
    DualCmd = 5,
    /// Quad command: 4-4-4 (everything on 4 lines)
    QuadCmd = 6,
}

impl BusWidth {
    /// Number of data lines used for the command phase
    pub const fn cmd_lines(&self) -> u8 {
        match self {
            Self::Single | Self::DualOut | Self::QuadOut | Self::DualIo | Self::QuadIo => 1,
            Self::DualCmd => 2,
            Self::QuadCmd => 4,
        }
    }

    /// Number of data lines used for the address phase
    pub const fn addr_lines(&self) -> u8 {
        match self {
            Self::Single | Self::DualOut | Self::QuadOut => 1,
            Self::DualIo | Self::DualCmd => 2,
            Self::QuadIo | Self::QuadCmd => 4,
        }
    }

    /// Number of data lines used for the data phase
    pub const fn data_lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::DualOut | Self::DualIo | Self::DualCmd => 2,
            Self::QuadOut | Self::QuadIo | Self::QuadCmd => 4,
        }
    }

    /// Raw WIDTH field value for the instruction frame register
    pub const fn value(&self) -> u32 {
        *self as u32
    }

    /// Decode a raw WIDTH field value
    pub const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Single),
            1 => Some(Self::DualOut),
            2 => Some(Self::QuadOut),
            3 => Some(Self::DualIo),
            4 => Some(Self::QuadIo),
            5 => Some(Self::DualCmd),
            6 => Some(Self::QuadCmd),
            _ => None,
        }
    }

    /// Conventional x-y-z name, e.g. "1-4-4"
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Single => "1-1-1",
            Self::DualOut => "1-1-2",
            Self::QuadOut => "1-1-4",
            Self::DualIo => "1-2-2",
            Self::QuadIo => "1-4-4",
            Self::DualCmd => "2-2-2",
            Self::QuadCmd => "4-4-4",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_lines() {
        assert_eq!(BusWidth::Single.cmd_lines(), 1);
        assert_eq!(BusWidth::QuadCmd.cmd_lines(), 4);
        assert_eq!(BusWidth::QuadIo.cmd_lines(), 1);
        assert_eq!(BusWidth::QuadIo.addr_lines(), 4);
        assert_eq!(BusWidth::QuadOut.addr_lines(), 1);
        assert_eq!(BusWidth::QuadOut.data_lines(), 4);
        assert_eq!(BusWidth::DualCmd.data_lines(), 2);
    }

    #[test]
    fn value_round_trip() {
        for v in 0..7 {
            let w = BusWidth::from_value(v).unwrap();
            assert_eq!(w.value(), v);
        }
        assert_eq!(BusWidth::from_value(7), None);
    }

    #[test]
    fn names_match_phases() {
        assert_eq!(BusWidth::Single.name(), "1-1-1");
        assert_eq!(BusWidth::QuadCmd.name(), "4-4-4");
        assert_eq!(BusWidth::DualIo.name(), "1-2-2");
    }
}

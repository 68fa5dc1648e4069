//! Value shapes used by type-constrained bindings.

use bitflags::bitflags;

bitflags! {
    /// Set of value shapes. A single value has exactly one shape bit; a type
    /// constraint is any union of them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ValueShape: u16 {
        const NIL = 1 << 0;
        const BOOL = 1 << 1;
        const INT = 1 << 2;
        const FLOAT = 1 << 3;
        const STRING = 1 << 4;
        const SYMBOL = 1 << 5;
        const ARRAY = 1 << 6;
        const HASH = 1 << 7;
        const MATCH = 1 << 8;
        const EXCEPTION = 1 << 9;
        const STREAM = 1 << 10;

        const NUMERIC = Self::INT.bits() | Self::FLOAT.bits();
        const STRING_OR_NIL = Self::STRING.bits() | Self::NIL.bits();
    }
}

/// Display names in the order they are listed in diagnostics.
const SHAPE_NAMES: &[(ValueShape, &str)] = &[
    (ValueShape::STRING, "String"),
    (ValueShape::SYMBOL, "Symbol"),
    (ValueShape::INT, "Integer"),
    (ValueShape::FLOAT, "Float"),
    (ValueShape::BOOL, "true or false"),
    (ValueShape::ARRAY, "Array"),
    (ValueShape::HASH, "Hash"),
    (ValueShape::MATCH, "MatchData"),
    (ValueShape::EXCEPTION, "Exception"),
    (ValueShape::STREAM, "IO"),
    (ValueShape::NIL, "nil"),
];

impl ValueShape {
    /// Describe the set for diagnostics, e.g. `"String or nil"`.
    pub fn describe(self) -> String {
        let names: Vec<&'static str> = SHAPE_NAMES
            .iter()
            .filter(|(shape, _)| self.contains(*shape))
            .map(|(_, name)| *name)
            .collect();
        match names.as_slice() {
            [] => "nothing".to_string(),
            [only] => (*only).to_string(),
            [init @ .., last] => format!("{} or {last}", init.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_members() {
        assert_eq!(ValueShape::STRING_OR_NIL.describe(), "String or nil");
        assert_eq!(ValueShape::STREAM.describe(), "IO");
        assert_eq!(ValueShape::NUMERIC.describe(), "Integer or Float");
        assert_eq!(ValueShape::empty().describe(), "nothing");
    }
}

//! Type-safe wrappers for variables, literals and three-valued assignments.
//!
//! The theory never owns an assignment: it reads truth values through the
//! [`Engine`][crate::engine::Engine] and only ever talks about variables and
//! literals allocated there.
use std::fmt;
use std::ops::{Neg, Not};

/// A variable identifier (1-indexed).
///
/// # Invariants
///
/// - Variable IDs must be >= 1 (0 is reserved, matching the DIMACS convention)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw variable ID as a `u32`.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns the variable ID as a `usize`, for indexing per-variable tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The positive literal of this variable.
    pub fn pos(self) -> Lit {
        Lit(self.0 as i32)
    }

    /// The negative literal of this variable.
    pub fn neg(self) -> Lit {
        Lit(-(self.0 as i32))
    }

    /// The literal of this variable with the given sign.
    pub fn lit(self, negated: bool) -> Lit {
        if negated {
            self.neg()
        } else {
            self.pos()
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A Boolean literal: a variable or its negation.
///
/// Stored as a signed integer, positive for the variable itself and negative
/// for its negation. Zero is not a valid literal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    /// Creates a literal from a signed DIMACS integer.
    ///
    /// # Panics
    ///
    /// Panics if `lit == 0`.
    pub fn from_dimacs(lit: i32) -> Self {
        assert_ne!(lit, 0, "Literal cannot be zero");
        Lit(lit)
    }

    /// Returns the signed DIMACS integer for this literal.
    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negated(self) -> bool {
        self.0 < 0
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        -self
    }
}

impl From<i32> for Lit {
    fn from(lit: i32) -> Self {
        Lit::from_dimacs(lit)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated() {
            write!(f, "~{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

/// A three-valued truth value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LBool {
    True,
    False,
    #[default]
    Undef,
}

impl LBool {
    pub fn is_true(self) -> bool {
        self == LBool::True
    }

    pub fn is_false(self) -> bool {
        self == LBool::False
    }

    pub fn is_undef(self) -> bool {
        self == LBool::Undef
    }

    /// The value of a literal whose variable has this value, given the literal's sign.
    pub fn under_sign(self, negated: bool) -> LBool {
        if negated {
            !self
        } else {
            self
        }
    }
}

impl Not for LBool {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            LBool::True => LBool::False,
            LBool::False => LBool::True,
            LBool::Undef => LBool::Undef,
        }
    }
}

impl From<bool> for LBool {
    fn from(value: bool) -> Self {
        if value {
            LBool::True
        } else {
            LBool::False
        }
    }
}

impl fmt::Display for LBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LBool::True => write!(f, "T"),
            LBool::False => write!(f, "F"),
            LBool::Undef => write!(f, "?"),
        }
    }
}

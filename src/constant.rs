//! [`Constant`] is a typed constant value, and the home of the static
//! evaluation used by constant folding.

use crate::{
    context::Context,
    instruction::{BinaryOpKind, Predicate, UnaryOpKind},
    irtype::Type,
    value::Value,
};

/// A [`Type`] and constant value, including composite aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub value: ConstantValue,
}

/// A constant representation of each of the supported [`Type`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Constant {
    pub fn new_unit(context: &Context) -> Self {
        Constant {
            ty: Type::get_void(context),
            value: ConstantValue::Unit,
        }
    }

    pub fn new_bool(context: &Context, b: bool) -> Self {
        Constant {
            ty: Type::get_bool(context),
            value: ConstantValue::Bool(b),
        }
    }

    pub fn new_int(context: &Context, width: u16, n: i64) -> Self {
        Constant {
            ty: Type::get_int(context, width),
            value: ConstantValue::Int(truncate_to_width(n as i128, width)),
        }
    }

    pub fn new_float(context: &Context, width: u16, n: f64) -> Self {
        Constant {
            ty: Type::get_float(context, width),
            value: ConstantValue::Float(if width == 32 { (n as f32) as f64 } else { n }),
        }
    }

    pub fn new_string(context: &Context, string: String) -> Self {
        Constant {
            ty: Type::get_string(context),
            value: ConstantValue::String(string),
        }
    }

    pub fn get_unit(context: &mut Context) -> Value {
        let new_const = Constant::new_unit(context);
        Value::new_constant(context, new_const)
    }

    pub fn get_bool(context: &mut Context, value: bool) -> Value {
        let new_const = Constant::new_bool(context, value);
        Value::new_constant(context, new_const)
    }

    pub fn get_int(context: &mut Context, width: u16, value: i64) -> Value {
        let new_const = Constant::new_int(context, width, value);
        Value::new_constant(context, new_const)
    }

    pub fn get_float(context: &mut Context, width: u16, value: f64) -> Value {
        let new_const = Constant::new_float(context, width, value);
        Value::new_constant(context, new_const)
    }

    pub fn get_string(context: &mut Context, value: String) -> Value {
        let new_const = Constant::new_string(context, value);
        Value::new_constant(context, new_const)
    }

    /// Compare two constant values for equality.
    pub fn eq(&self, other: &Constant) -> bool {
        self.ty == other.ty && self.value == other.value
    }

    /// Statically evaluate a binary operation over two constants.
    ///
    /// Integer arithmetic is performed at full width and truncated (wrapped)
    /// to the declared width of the left operand.  Float arithmetic uses the
    /// wider of the two operand widths.  Returns `None` when the operation
    /// cannot be evaluated, notably any division or modulo with a constant
    /// zero divisor, which is left for the runtime to trap on.
    pub fn eval_binary(
        context: &Context,
        op: BinaryOpKind,
        lhs: &Constant,
        rhs: &Constant,
    ) -> Option<Constant> {
        match (&lhs.value, &rhs.value) {
            (ConstantValue::Int(l), ConstantValue::Int(r)) => {
                let width = lhs.ty.get_int_width(context)?;
                let (l, r) = (*l as i128, *r as i128);
                let result = match op {
                    BinaryOpKind::Add => l.wrapping_add(r),
                    BinaryOpKind::Sub => l.wrapping_sub(r),
                    BinaryOpKind::Mul => l.wrapping_mul(r),
                    BinaryOpKind::Div | BinaryOpKind::IntDiv => {
                        if r == 0 {
                            return None;
                        }
                        l.wrapping_div(r)
                    }
                    BinaryOpKind::Mod => {
                        if r == 0 {
                            return None;
                        }
                        l.wrapping_rem(r)
                    }
                    BinaryOpKind::And => l & r,
                    BinaryOpKind::Or => l | r,
                    BinaryOpKind::Xor => l ^ r,
                    BinaryOpKind::Lsh => l.wrapping_shl(r as u32),
                    BinaryOpKind::Rsh => l.wrapping_shr(r as u32),
                };
                Some(Constant {
                    ty: lhs.ty,
                    value: ConstantValue::Int(truncate_to_width(result, width)),
                })
            }
            (ConstantValue::Float(l), ConstantValue::Float(r)) => {
                let l_width = lhs.ty.get_float_width(context)?;
                let r_width = rhs.ty.get_float_width(context)?;
                let width = l_width.max(r_width);
                let result = match op {
                    BinaryOpKind::Add => l + r,
                    BinaryOpKind::Sub => l - r,
                    BinaryOpKind::Mul => l * r,
                    BinaryOpKind::Div => {
                        if *r == 0.0 {
                            return None;
                        }
                        l / r
                    }
                    BinaryOpKind::IntDiv => {
                        if *r == 0.0 {
                            return None;
                        }
                        (l / r).trunc()
                    }
                    BinaryOpKind::Mod => {
                        if *r == 0.0 {
                            return None;
                        }
                        l % r
                    }
                    // No bitwise operations on floats.
                    BinaryOpKind::And
                    | BinaryOpKind::Or
                    | BinaryOpKind::Xor
                    | BinaryOpKind::Lsh
                    | BinaryOpKind::Rsh => return None,
                };
                Some(Constant::new_float(context, width, result))
            }
            (ConstantValue::Bool(l), ConstantValue::Bool(r)) => {
                let result = match op {
                    BinaryOpKind::And => l & r,
                    BinaryOpKind::Or => l | r,
                    BinaryOpKind::Xor => l ^ r,
                    _ => return None,
                };
                Some(Constant::new_bool(context, result))
            }
            _ => None,
        }
    }

    /// Statically evaluate a unary operation over a constant.
    pub fn eval_unary(context: &Context, op: UnaryOpKind, arg: &Constant) -> Option<Constant> {
        match (&op, &arg.value) {
            (UnaryOpKind::Not, ConstantValue::Bool(b)) => Some(Constant::new_bool(context, !b)),
            (UnaryOpKind::Not, ConstantValue::Int(n)) => {
                let width = arg.ty.get_int_width(context)?;
                Some(Constant {
                    ty: arg.ty,
                    value: ConstantValue::Int(truncate_to_width(!(*n as i128), width)),
                })
            }
            (UnaryOpKind::Neg, ConstantValue::Int(n)) => {
                let width = arg.ty.get_int_width(context)?;
                Some(Constant {
                    ty: arg.ty,
                    value: ConstantValue::Int(truncate_to_width(
                        (*n as i128).wrapping_neg(),
                        width,
                    )),
                })
            }
            (UnaryOpKind::Neg, ConstantValue::Float(f)) => {
                let width = arg.ty.get_float_width(context)?;
                Some(Constant::new_float(context, width, -f))
            }
            _ => None,
        }
    }

    /// Statically evaluate a comparison between two constants.
    pub fn eval_cmp(pred: Predicate, lhs: &Constant, rhs: &Constant) -> Option<bool> {
        use std::cmp::Ordering;
        let ordering = match (&lhs.value, &rhs.value) {
            (ConstantValue::Int(l), ConstantValue::Int(r)) => l.cmp(r),
            (ConstantValue::Float(l), ConstantValue::Float(r)) => l.partial_cmp(r)?,
            (ConstantValue::Bool(l), ConstantValue::Bool(r)) => match pred {
                Predicate::Equal => return Some(l == r),
                Predicate::NotEqual => return Some(l != r),
                _ => return None,
            },
            (ConstantValue::String(l), ConstantValue::String(r)) => match pred {
                Predicate::Equal => return Some(l == r),
                Predicate::NotEqual => return Some(l != r),
                _ => return None,
            },
            _ => return None,
        };
        Some(match pred {
            Predicate::Equal => ordering == Ordering::Equal,
            Predicate::NotEqual => ordering != Ordering::Equal,
            Predicate::LessThan => ordering == Ordering::Less,
            Predicate::LessThanOrEqual => ordering != Ordering::Greater,
            Predicate::GreaterThan => ordering == Ordering::Greater,
            Predicate::GreaterThanOrEqual => ordering != Ordering::Less,
        })
    }
}

/// Truncate a full-width result to `width` bits, sign extending back to i64.
fn truncate_to_width(value: i128, width: u16) -> i64 {
    if width >= 64 {
        value as i64
    } else {
        let bits = width as u32;
        let mask = (1u64 << bits) - 1;
        let narrowed = (value as u64) & mask;
        let sign_bit = 1u64 << (bits - 1);
        if narrowed & sign_bit != 0 {
            (narrowed | !mask) as i64
        } else {
            narrowed as i64
        }
    }
}

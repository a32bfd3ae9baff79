//! A typed, named memory slot local to a [`crate::Function`].
//!
//! Locals are addressed through the `GetLocal` instruction and read/written
//! with `Load`/`Store`; the IR keeps them out of the value graph so that
//! mutation is explicit.

use crate::{constant::Constant, context::Context, irtype::Type};

/// A wrapper around a slotmap handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LocalVar(pub slotmap::DefaultKey);

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct LocalVarContent {
    pub ptr_ty: Type,
    pub initializer: Option<Constant>,
    pub mutable: bool,
}

impl LocalVar {
    /// Return a new local of a specific type with an optional initializer.
    pub fn new(
        context: &mut Context,
        ty: Type,
        initializer: Option<Constant>,
        mutable: bool,
    ) -> Self {
        let ptr_ty = Type::new_ptr(context, ty);
        let content = LocalVarContent {
            ptr_ty,
            initializer,
            mutable,
        };
        LocalVar(context.local_vars.insert(content))
    }

    /// Return the type of this local variable, which is always a pointer.
    pub fn get_type(&self, context: &Context) -> Type {
        context.local_vars[self.0].ptr_ty
    }

    /// Return the inner (pointed to) type.
    pub fn get_inner_type(&self, context: &Context) -> Type {
        self.get_type(context)
            .get_pointee_type(context)
            .expect("local is always a pointer")
    }

    pub fn get_initializer<'a>(&self, context: &'a Context) -> Option<&'a Constant> {
        context.local_vars[self.0].initializer.as_ref()
    }

    pub fn is_mutable(&self, context: &Context) -> bool {
        context.local_vars[self.0].mutable
    }
}

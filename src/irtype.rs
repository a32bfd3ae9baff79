//! Each of the types a [`crate::Value`] may have.
//!
//! Types are interned in the [`Context`]: equal type contents always share the
//! same [`Type`] handle, so comparing handles compares types.

use crate::context::Context;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Type(pub slotmap::DefaultKey);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeContent {
    Void,
    Bool,
    Int(u16),
    Float(u16),
    StringSlice,
    Pointer(Type),
    Array(Type, u64),
    Tuple(Vec<Type>),
    Class(String),
}

impl Type {
    fn get_or_create_unique_type(context: &mut Context, t: TypeContent) -> Type {
        // Trying to avoid cloning t unless we're creating a new type.
        #[allow(clippy::map_entry)]
        if !context.type_map.contains_key(&t) {
            let new_type = Type(context.types.insert(t.clone()));
            context.type_map.insert(t, new_type);
            new_type
        } else {
            context.type_map.get(&t).copied().unwrap()
        }
    }

    /// Get Type if it already exists.
    pub fn get_type(context: &Context, t: &TypeContent) -> Option<Type> {
        context.type_map.get(t).copied()
    }

    pub fn create_base_types(context: &mut Context) {
        Self::get_or_create_unique_type(context, TypeContent::Void);
        Self::get_or_create_unique_type(context, TypeContent::Bool);
        Self::get_or_create_unique_type(context, TypeContent::Int(8));
        Self::get_or_create_unique_type(context, TypeContent::Int(16));
        Self::get_or_create_unique_type(context, TypeContent::Int(32));
        Self::get_or_create_unique_type(context, TypeContent::Int(64));
        Self::get_or_create_unique_type(context, TypeContent::Float(32));
        Self::get_or_create_unique_type(context, TypeContent::Float(64));
        Self::get_or_create_unique_type(context, TypeContent::StringSlice);
    }

    /// Get the content for this [Type].
    pub fn get_content<'a>(&self, context: &'a Context) -> &'a TypeContent {
        &context.types[self.0]
    }

    /// Get void type.
    pub fn get_void(context: &Context) -> Type {
        Self::get_type(context, &TypeContent::Void).expect("create_base_types not called")
    }

    /// Get bool type.
    pub fn get_bool(context: &Context) -> Type {
        Self::get_type(context, &TypeContent::Bool).expect("create_base_types not called")
    }

    /// Get an integer type of the given bit width.  The base widths (8, 16,
    /// 32, 64) always exist.
    pub fn get_int(context: &Context, width: u16) -> Type {
        Self::get_type(context, &TypeContent::Int(width)).expect("create_base_types not called")
    }

    /// Get a float type of the given bit width (32 or 64).
    pub fn get_float(context: &Context, width: u16) -> Type {
        Self::get_type(context, &TypeContent::Float(width)).expect("create_base_types not called")
    }

    /// Get string slice type.
    pub fn get_string(context: &Context) -> Type {
        Self::get_type(context, &TypeContent::StringSlice).expect("create_base_types not called")
    }

    /// New pointer type.
    pub fn new_ptr(context: &mut Context, to_ty: Type) -> Type {
        Self::get_or_create_unique_type(context, TypeContent::Pointer(to_ty))
    }

    /// New array type.
    pub fn new_array(context: &mut Context, elem_ty: Type, len: u64) -> Type {
        Self::get_or_create_unique_type(context, TypeContent::Array(elem_ty, len))
    }

    /// New tuple type.
    pub fn new_tuple(context: &mut Context, fields: Vec<Type>) -> Type {
        Self::get_or_create_unique_type(context, TypeContent::Tuple(fields))
    }

    /// New (or existing) class type, identified by name.
    pub fn new_class(context: &mut Context, name: String) -> Type {
        Self::get_or_create_unique_type(context, TypeContent::Class(name))
    }

    pub fn is_void(&self, context: &Context) -> bool {
        matches!(*self.get_content(context), TypeContent::Void)
    }

    pub fn is_bool(&self, context: &Context) -> bool {
        matches!(*self.get_content(context), TypeContent::Bool)
    }

    pub fn is_int(&self, context: &Context) -> bool {
        matches!(*self.get_content(context), TypeContent::Int(_))
    }

    pub fn is_float(&self, context: &Context) -> bool {
        matches!(*self.get_content(context), TypeContent::Float(_))
    }

    pub fn is_ptr(&self, context: &Context) -> bool {
        matches!(*self.get_content(context), TypeContent::Pointer(_))
    }

    pub fn get_int_width(&self, context: &Context) -> Option<u16> {
        match *self.get_content(context) {
            TypeContent::Int(width) => Some(width),
            _ => None,
        }
    }

    pub fn get_float_width(&self, context: &Context) -> Option<u16> {
        match *self.get_content(context) {
            TypeContent::Float(width) => Some(width),
            _ => None,
        }
    }

    /// What does this pointer point at?
    pub fn get_pointee_type(&self, context: &Context) -> Option<Type> {
        match *self.get_content(context) {
            TypeContent::Pointer(to_ty) => Some(to_ty),
            _ => None,
        }
    }

    pub fn get_array_elem_type(&self, context: &Context) -> Option<Type> {
        match *self.get_content(context) {
            TypeContent::Array(elem_ty, _) => Some(elem_ty),
            _ => None,
        }
    }

    pub fn get_array_len(&self, context: &Context) -> Option<u64> {
        match *self.get_content(context) {
            TypeContent::Array(_, len) => Some(len),
            _ => None,
        }
    }

    pub fn get_tuple_field_type(&self, context: &Context, index: u64) -> Option<Type> {
        match self.get_content(context) {
            TypeContent::Tuple(fields) => fields.get(index as usize).copied(),
            _ => None,
        }
    }

    /// A string representation, for the printer and error messages.
    pub fn as_string(&self, context: &Context) -> String {
        match self.get_content(context) {
            TypeContent::Void => "void".to_owned(),
            TypeContent::Bool => "bool".to_owned(),
            TypeContent::Int(width) => format!("i{width}"),
            TypeContent::Float(width) => format!("f{width}"),
            TypeContent::StringSlice => "str".to_owned(),
            TypeContent::Pointer(to_ty) => format!("ptr {}", to_ty.as_string(context)),
            TypeContent::Array(elem_ty, len) => {
                format!("[{}; {len}]", elem_ty.as_string(context))
            }
            TypeContent::Tuple(fields) => {
                use itertools::Itertools;
                format!(
                    "({})",
                    fields.iter().map(|ty| ty.as_string(context)).join(", ")
                )
            }
            TypeContent::Class(name) => format!("class {name}"),
        }
    }
}

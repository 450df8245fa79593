//! LLVM declarations of the runtime ABI for code generators built on inkwell.

use crate::runtime::entry_points::{AbiType, ENTRY_POINTS, SINGLETONS};
use inkwell::attributes::{Attribute, AttributeLoc};
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::{BasicMetadataTypeEnum, BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, GlobalValue};
use inkwell::AddressSpace;
use std::collections::HashMap;

pub const VALUE_TYPE_NAME: &str = "prime_value";

pub struct RuntimeAbi<'ctx> {
    pub value_type: StructType<'ctx>,
    functions: HashMap<&'static str, FunctionValue<'ctx>>,
    singletons: HashMap<&'static str, GlobalValue<'ctx>>,
}

fn basic_type<'ctx>(context: &'ctx Context, ty: AbiType) -> Option<BasicTypeEnum<'ctx>> {
    match ty {
        AbiType::Void | AbiType::Never => None,
        AbiType::Bool => Some(context.bool_type().into()),
        AbiType::Int => Some(context.i128_type().into()),
        AbiType::ValueRef
        | AbiType::OwnedValue
        | AbiType::CString
        | AbiType::ThunkFn
        | AbiType::ClosureFn
        | AbiType::Env
        | AbiType::ReleaseFn => Some(context.ptr_type(AddressSpace::default()).into()),
    }
}

impl<'ctx> RuntimeAbi<'ctx> {
    /// Declares every runtime function and singleton as external symbols of
    /// `module`. Declarations already present are reused.
    pub fn declare(context: &'ctx Context, module: &Module<'ctx>) -> Self {
        let value_type = context
            .get_struct_type(VALUE_TYPE_NAME)
            .unwrap_or_else(|| context.opaque_struct_type(VALUE_TYPE_NAME));
        let noreturn = context.create_enum_attribute(Attribute::get_named_enum_kind_id("noreturn"), 0);

        let mut functions = HashMap::new();
        for entry in ENTRY_POINTS {
            let params: Vec<BasicMetadataTypeEnum> = entry
                .params
                .iter()
                .filter_map(|(_, ty)| basic_type(context, *ty))
                .map(Into::into)
                .collect();
            let fn_type = match basic_type(context, entry.returns) {
                Some(returns) => returns.fn_type(&params, false),
                None => context.void_type().fn_type(&params, false),
            };
            let function = module
                .get_function(entry.name)
                .unwrap_or_else(|| module.add_function(entry.name, fn_type, Some(Linkage::External)));
            if entry.returns == AbiType::Never {
                function.add_attribute(AttributeLoc::Function, noreturn);
            }
            functions.insert(entry.name, function);
        }

        let mut singletons = HashMap::new();
        for name in SINGLETONS {
            let global = module.get_global(name).unwrap_or_else(|| {
                let global = module.add_global(value_type, Some(AddressSpace::default()), name);
                global.set_linkage(Linkage::External);
                global.set_constant(true);
                global
            });
            singletons.insert(name, global);
        }

        Self {
            value_type,
            functions,
            singletons,
        }
    }

    pub fn function(&self, name: &str) -> Option<FunctionValue<'ctx>> {
        self.functions.get(name).copied()
    }

    pub fn singleton(&self, name: &str) -> Option<GlobalValue<'ctx>> {
        self.singletons.get(name).copied()
    }
}

/// Textual IR containing only the runtime declarations.
pub fn declarations_ir() -> String {
    let context = Context::create();
    let module = context.create_module("prime_rt");
    RuntimeAbi::declare(&context, &module);
    module.print_to_string().to_string()
}

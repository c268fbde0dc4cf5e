//! Leaf operations: constants, variable lookups, member and index access.

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::{Lifecycle, StepEnv};

/// `Con`: a literal value.
#[derive(Debug, Clone)]
pub(crate) struct ConOp {
    pub(crate) value: Value,
}

impl Lifecycle for ConOp {
    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, _deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, self.value.clone()))
    }
}

/// `Var`: the topmost context binding of a name.
#[derive(Debug, Clone)]
pub(crate) struct VarOp {
    pub(crate) name: String,
}

impl Lifecycle for VarOp {
    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, _deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let value = ctx.get(&self.name)?.clone();
        Ok((ctx, value))
    }
}

/// `GetAttr`: a named member of the evaluated object, with an optional
/// default.
///
/// The default operand, when present, is evaluated alongside the object so
/// both are plain dependencies; it is only consulted when the member is
/// absent.
#[derive(Debug, Clone)]
pub(crate) struct GetAttrOp {
    pub(crate) obj: OpRef,
    pub(crate) name: String,
    pub(crate) default: Option<OpRef>,
}

impl Lifecycle for GetAttrOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let mut deps = vec![self.obj.clone()];
        if let Some(default) = &self.default {
            deps.push(default.clone());
        }
        Ok((ctx, deps))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let target = &deps[0];
        if let Some(found) = target.attr(&self.name) {
            return Ok((ctx, found));
        }
        match deps.get(1) {
            Some(default) => Ok((ctx, default.clone())),
            None => Err(OpError::MemberMissing {
                name: self.name.clone(),
                type_name: target.type_name(),
            }),
        }
    }
}

/// `GetItem`: indexes the evaluated object by the evaluated key.
#[derive(Debug, Clone)]
pub(crate) struct GetItemOp {
    pub(crate) obj: OpRef,
    pub(crate) key: OpRef,
}

impl Lifecycle for GetItemOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, vec![self.obj.clone(), self.key.clone()]))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let (target, key) = (&deps[0], &deps[1]);
        match target.index(key) {
            Some(found) => Ok((ctx, found)),
            None => Err(OpError::IndexMissing {
                key: key.to_string(),
                type_name: target.type_name(),
            }),
        }
    }
}

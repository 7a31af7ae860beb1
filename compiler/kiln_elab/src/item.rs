//! Items: definitions, modules and tests.

use kiln_ir::surface::{SDef, SItem, SModule, STest};
use kiln_ir::{Def, EffectSet, Item, Modifiers, Module, ModuleKind, Name, Param, Test};

use crate::ctx::{Ctx, Mode, META_STAGE, OBJECT_STAGE};
use crate::{effect_set, Elaborator};

impl Elaborator {
    /// Elaborate one item. Definitions are registered with the normalizer
    /// as they complete, so later items of the same unit can see them.
    pub fn elaborate_item(&mut self, item: &SItem) -> Item {
        match item {
            SItem::Def(def) => Item::Def(self.elaborate_def(def)),
            SItem::Mod(module) => Item::Mod(self.elaborate_module(module)),
            SItem::Test(test) => Item::Test(self.elaborate_test(test)),
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(def = %def.name))]
    fn elaborate_def(&mut self, def: &SDef) -> Def {
        let name = self.qualify(def.name);
        let modifiers = def.modifiers | self.inherited;
        let stage = if modifiers.contains(Modifiers::CONST) {
            META_STAGE
        } else {
            OBJECT_STAGE
        };
        let effects = effect_set(&def.effects);
        let mut ctx = Ctx::new(stage, effects.clone());

        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let mode = ctx.binder_type_mode(param.relevant);
            let (ty_term, ty) = self.check_type(&ctx.with_mode(mode), &param.ty);
            let erased = ctx.with_mode(Mode::Irrelevant);
            let lower = param.lower.as_ref().map(|b| self.check(&erased, b, &ty));
            let upper = param.upper.as_ref().map(|b| self.check(&erased, b, &ty));
            if param.relevant {
                self.check_representable(&ctx, param.ty.id, &ty);
            }
            params.push(Param {
                name: param.name,
                relevant: param.relevant,
                lower,
                upper,
                type_relevant: param.type_relevant,
                ty: ty_term,
            });
            ctx.bind(param.name, ty, param.relevant, param.type_relevant);
        }

        let mode = ctx.binder_type_mode(true);
        let (result, result_ty) = self.check_type(&ctx.with_mode(mode), &def.result);

        // Register the signature first so the body may recurse.
        let header = Def {
            id: def.id,
            name,
            modifiers,
            params,
            result,
            effects,
            body: None,
        };
        self.norm.define_local(header.clone());

        let body = def.body.as_ref().map(|body| self.check(&ctx, body, &result_ty));
        let def = Def { body, ..header };
        self.norm.define_local(def.clone());
        def
    }

    fn elaborate_module(&mut self, module: &SModule) -> Module {
        let name = self.qualify(module.name);
        let kind_modifiers = match module.kind {
            ModuleKind::Structure => Modifiers::empty(),
            ModuleKind::Signature => Modifiers::ABSTRACT,
            ModuleKind::Opaque => Modifiers::OPAQUE,
        };
        let saved = self.inherited;
        let depth = self.module_path.len();
        self.inherited |= module.modifiers | kind_modifiers;
        self.module_path
            .extend(module.name.as_str().split(Name::SEPARATOR).map(Name::new));

        let items = module.items.iter().map(|item| self.elaborate_item(item)).collect();

        self.module_path.truncate(depth);
        self.inherited = saved;
        Module {
            id: module.id,
            name,
            modifiers: module.modifiers,
            kind: module.kind,
            items,
        }
    }

    /// A test is a runtime body with no parameters and no effects.
    fn elaborate_test(&mut self, test: &STest) -> Test {
        let ctx = Ctx::new(OBJECT_STAGE, EffectSet::new());
        let (body, _) = self.infer(&ctx, &test.body);
        Test {
            id: test.id,
            name: self.qualify(test.name),
            body,
        }
    }
}

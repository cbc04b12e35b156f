use proptest::prelude::*;
use uigen_policy::{AllowList, ComplianceVerdict, DependencyPolicyGate};
use uigen_syntax::SyntaxTreeAnalyzer;

fn module_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("react".to_string()),
        Just("react-dom".to_string()),
        Just("lodash".to_string()),
        Just("lodash-es".to_string()),
        Just("moment".to_string()),
        Just("./local".to_string()),
        "[a-z][a-z-]{0,8}",
    ]
}

fn render(modules: &[(String, u8)]) -> String {
    let mut code = String::new();
    for (i, (module, form)) in modules.iter().enumerate() {
        let line = match form % 4 {
            0 => format!("import m{i} from '{module}';\n"),
            1 => format!("import * as m{i} from \"{module}\";\n"),
            2 => format!("const m{i} = require('{module}');\n"),
            _ => format!("const m{i} = () => import('{module}');\n"),
        };
        code.push_str(&line);
    }
    code.push_str("export default function App() { return <div />; }\n");
    code
}

#[test]
fn scenario_react_and_lodash_only_is_compliant() {
    let gate = DependencyPolicyGate::new(AllowList::new(["react", "react-dom", "lodash"]).unwrap());
    let imports = SyntaxTreeAnalyzer::new()
        .analyze("import React from 'react';\nimport _ from 'lodash';\n")
        .unwrap();
    assert_eq!(gate.evaluate(&imports).verdict, ComplianceVerdict::Compliant);
}

proptest! {
    #[test]
    fn prop_violation_iff_some_import_not_allowed(
        modules in proptest::collection::vec((module_name(), any::<u8>()), 0..6),
        allowed in proptest::collection::vec(module_name(), 0..4),
    ) {
        let gate = DependencyPolicyGate::new(AllowList::new(allowed.clone()).unwrap());
        let code = render(&modules);
        let imports = SyntaxTreeAnalyzer::new().analyze(&code).unwrap();
        prop_assert_eq!(imports.len(), modules.len());

        let report = gate.evaluate(&imports);
        let expected_violation = modules.iter().any(|(m, _)| !allowed.contains(m));
        prop_assert_eq!(report.verdict == ComplianceVerdict::Violation, expected_violation);
        prop_assert_eq!(report.violations.is_empty(), !expected_violation);
        for violation in &report.violations {
            prop_assert!(!allowed.contains(&violation.specifier));
        }
    }

    #[test]
    fn prop_zero_imports_is_compliant(
        allowed in proptest::collection::vec(module_name(), 0..4),
    ) {
        let gate = DependencyPolicyGate::new(AllowList::new(allowed).unwrap());
        let imports = SyntaxTreeAnalyzer::new().analyze(&render(&[])).unwrap();
        prop_assert!(gate.evaluate(&imports).is_compliant());
    }
}

// Copyright 2026 the user-code runner authors. MIT license.

//! End-to-end tests of the runner over scripted collaborators: the fake
//! compiler replays the diagnostics and checker answers the real compiler
//! would produce for each fixture, and the fake sandbox replays module
//! behaviors against the real evaluation context.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;

use runner_test_util::DefaultExport;
use runner_test_util::FakeCompiler;
use runner_test_util::FakeProgram;
use runner_test_util::FakeProgramBuilder;
use runner_test_util::FakeSandbox;
use runner_test_util::ModuleBehavior;
use user_code_core::Binding;
use user_code_core::CallSignature;
use user_code_core::DeclarationShape;
use user_code_core::Diagnostic;
use user_code_core::EvalContext;
use user_code_core::Parameter;
use user_code_core::Span;
use user_code_runner::strings::trim_template;
use user_code_runner::synthesize_harness;
use user_code_runner::AuxFile;
use user_code_runner::CompileRequest;
use user_code_runner::HostError;
use user_code_runner::Location;
use user_code_runner::MemoryCache;
use user_code_runner::Runner;
use user_code_runner::RunnerOptions;
use user_code_runner::UserCodeError;

const USER_TS: &str = "__user_file.ts";
const HARNESS_TS: &str = "__execution_harness.ts";

// Line 1 of the emitted user module: columns 0, 43 and 79 map straight back
// to the same columns of the original source.
const USER_MAP: &str = r#"{"version":3,"sources":["__user_file"],"names":[],"mappings":"AAAA,2CAA2C,oCAAoC"}"#;

fn options() -> RunnerOptions {
  let _ = env_logger::builder().is_test(true).try_init();
  RunnerOptions {
    timeout: Duration::from_millis(100),
    cache: Box::new(MemoryCache::new()),
    ..Default::default()
  }
}

fn user_program(user_source: &str, harness_text: &str) -> FakeProgramBuilder {
  FakeProgram::builder()
    .file(USER_TS, user_source)
    .file(HARNESS_TS, harness_text)
}

#[tokio::test]
async fn return_type_mismatch_points_at_the_annotation() {
  let user = "export default function F(s: string): string { return s + ' world'; }";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "number", &arg_types);

  let program = user_program(user, &harness.text)
    .function(USER_TS, Span::new(15, 54), "F")
    .default_export(
      USER_TS,
      DefaultExport {
        via_alias: false,
        signature: Some(CallSignature {
          return_type: "string".to_string(),
          params: vec![Parameter {
            name: "s".to_string(),
            type_string: "string".to_string(),
            span: Span::new(26, 9),
          }],
        }),
        declaration: Some(DeclarationShape {
          span: Span::new(0, 69),
          signature_span: Some(Span::new(15, 29)),
          return_annotation: Some(Span::new(38, 6)),
          is_function_like: true,
        }),
      },
    )
    .diagnostic(Diagnostic::new(
      HARNESS_TS,
      harness.anchors.result_lhs,
      2322,
      "Type 'string' is not assignable to type 'number'.",
    ))
    .build();

  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let request = CompileRequest {
    user_source: user,
    return_type: "number",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(
      &mut FakeSandbox::new(),
      &EvalContext::new(),
      &request,
      &[json!("hello")],
      None,
    )
    .await
    .unwrap();

  assert_eq!(
    outcome.unwrap_err(),
    vec![UserCodeError::new(
      "TypeError: TS2322 Incorrect return type. Expected: 'number', Actual: 'string'.",
      "at F(1:39)",
      Location::new(1, 39),
    )]
  );
}

#[tokio::test]
async fn argument_arity_mismatch_points_at_the_parameter_list() {
  let user = "export default function F(s: string, n: number): string { return s; }";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "string", &arg_types);

  let program = user_program(user, &harness.text)
    .function(USER_TS, Span::new(15, 54), "F")
    .default_export(
      USER_TS,
      DefaultExport {
        via_alias: false,
        signature: Some(CallSignature {
          return_type: "string".to_string(),
          params: vec![
            Parameter {
              name: "s".to_string(),
              type_string: "string".to_string(),
              span: Span::new(26, 9),
            },
            Parameter {
              name: "n".to_string(),
              type_string: "number".to_string(),
              span: Span::new(37, 9),
            },
          ],
        }),
        declaration: Some(DeclarationShape {
          span: Span::new(0, 69),
          signature_span: Some(Span::new(15, 40)),
          return_annotation: Some(Span::new(49, 6)),
          is_function_like: true,
        }),
      },
    )
    .diagnostic(Diagnostic::new(
      HARNESS_TS,
      harness.anchors.call,
      2554,
      "Expected 2 arguments, but got 1.",
    ))
    .build();

  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(
      &mut FakeSandbox::new(),
      &EvalContext::new(),
      &request,
      &[json!("hello")],
      None,
    )
    .await
    .unwrap();

  assert_eq!(
    outcome.unwrap_err(),
    vec![UserCodeError::new(
      "TypeError: TS2554 Incorrect argument type. Expected: '[string]', Actual: '[string, number]'.",
      "at F(1:27)",
      Location::new(1, 27),
    )]
  );
}

#[tokio::test]
async fn missing_default_export_is_a_type_diagnostic() {
  let user = "export function F(s: string): string { return s; }";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "string", &arg_types);

  let program = user_program(user, &harness.text)
    .diagnostic(Diagnostic::new(
      HARNESS_TS,
      Span::new(0, 40),
      1192,
      "Module '__user_file' has no default export.",
    ))
    .build();

  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(
      &mut FakeSandbox::new(),
      &EvalContext::new(),
      &request,
      &[json!("hello")],
      None,
    )
    .await
    .unwrap();

  assert_eq!(
    outcome.unwrap_err(),
    vec![UserCodeError::new(
      "TypeError: TS1192 No default export. Expected a default export function with the signature: \"(...args: [string]) => string\".",
      "at (1:1)",
      Location::new(1, 1),
    )]
  );
}

#[tokio::test]
async fn uncallable_default_export_points_at_the_export_statement() {
  let user = "const h = 'hi'; export default h;";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "string", &arg_types);

  let program = user_program(user, &harness.text)
    .default_export(
      USER_TS,
      DefaultExport {
        via_alias: true,
        signature: None,
        declaration: Some(DeclarationShape {
          span: Span::new(16, 17),
          signature_span: None,
          return_annotation: None,
          is_function_like: false,
        }),
      },
    )
    .diagnostic(Diagnostic::new(
      HARNESS_TS,
      harness.anchors.callee,
      2349,
      "This expression is not callable.",
    ))
    .build();

  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(
      &mut FakeSandbox::new(),
      &EvalContext::new(),
      &request,
      &[json!("x")],
      None,
    )
    .await
    .unwrap();

  let errors = outcome.unwrap_err();
  assert!(errors[0]
    .message
    .starts_with("TypeError: TS2349 Default export is not a valid function."));
  assert_eq!(errors[0].location, Location::new(1, 17));
}

#[tokio::test]
async fn runtime_throw_maps_both_frames_into_the_user_source() {
  let user = "export default function F(s:string):string{sub();return s;} function sub(){throw new Error('X');}";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "string", &arg_types);

  let program = user_program(user, &harness.text).build();
  let compiler =
    FakeCompiler::new(program).with_source_map("__user_file", USER_MAP);
  let runner = Runner::with_options(Box::new(compiler), options());

  let mut sandbox = FakeSandbox::new().script(
    "__execution_harness",
    &["__user_file"],
    ModuleBehavior::Throw {
      message: "X".to_string(),
      stack: [
        "    at sub (__user_file:1:80)",
        "    at F (__user_file:1:44)",
        "    at __execution_harness:6:10",
      ]
      .join("\n"),
    },
  );

  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(&mut sandbox, &EvalContext::new(), &request, &[json!("s")], None)
    .await
    .unwrap();

  assert_eq!(
    outcome.unwrap_err(),
    vec![UserCodeError::new(
      "Error: X",
      "at sub(1:80)\nat F(1:44)",
      Location::new(1, 80),
    )]
  );
}

#[tokio::test]
async fn ambient_injection_and_aux_import_order() {
  let helpers = trim_template(
    "
    declare global {
      function g(s: string): string;
    }
    export {};
    ",
  );
  let user = "import 'helpers';\nexport default function F(s: string): string { return g(s); }";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&["helpers"], "string", &arg_types);

  let program = user_program(user, &harness.text)
    .file("helpers.ts", &helpers)
    .build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());

  let mut sandbox = FakeSandbox::new()
    .script("helpers", &[], ModuleBehavior::Inert)
    .script("__user_file", &["helpers"], ModuleBehavior::Inert)
    .script(
      "__execution_harness",
      &["helpers", "__user_file"],
      ModuleBehavior::CallBinding {
        binding: "g".to_string(),
        set_result: true,
      },
    );

  let ctx = EvalContext::new();
  ctx.inject(
    "g",
    Binding::Function(Rc::new(|args| {
      json!(format!("g:{}", args[0].as_str().unwrap_or_default()))
    })),
  );

  let aux_files = vec![AuxFile::new("helpers.ts", helpers.clone())];
  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &aux_files,
  };
  let outcome = runner
    .execute_user_code(&mut sandbox, &ctx, &request, &[json!("x")], None)
    .await
    .unwrap();

  assert_eq!(outcome.unwrap(), json!("g:x"));
  assert_eq!(
    sandbox.evaluation_order(),
    ["helpers", "__user_file", "__execution_harness"]
  );
}

#[tokio::test]
async fn timeout_surfaces_as_a_runtime_error() {
  let user = "export default function F(): string { for (;;) {} }";
  let harness = synthesize_harness(&[], "string", &[]);

  let program = user_program(user, &harness.text).build();
  let runner =
    Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let mut sandbox = FakeSandbox::new().script(
    "__execution_harness",
    &["__user_file"],
    ModuleBehavior::TimeOut,
  );

  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &[],
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(&mut sandbox, &EvalContext::new(), &request, &[], None)
    .await
    .unwrap();

  let errors = outcome.unwrap_err();
  assert_eq!(
    errors[0].message,
    "Error: Script execution timed out after 100ms"
  );
  assert_eq!(errors[0].location, Location::new(1, 1));
  assert_eq!(errors[0].stack, "");
}

#[tokio::test]
async fn identical_inputs_compile_once_and_yield_equal_diagnostics() {
  let user = "export function F(s: string): string { return s; }";
  let arg_types = vec!["string".to_string()];
  let harness = synthesize_harness(&[], "string", &arg_types);

  let program = user_program(user, &harness.text)
    .diagnostic(Diagnostic::new(HARNESS_TS, Span::new(0, 40), 1192, "raw"))
    .build();
  let compiler = FakeCompiler::new(program);
  let counter = compiler.counter();
  let runner = Runner::with_options(Box::new(compiler), options());

  let request = CompileRequest {
    user_source: user,
    return_type: "string",
    arg_types: &arg_types,
    aux_files: &[],
  };
  let first = runner.pre_process(&request).await.unwrap().unwrap_err();
  let second = runner.pre_process(&request).await.unwrap().unwrap_err();

  assert_eq!(counter.get(), 1);
  assert_eq!(
    serde_json::to_value(&first).unwrap(),
    serde_json::to_value(&second).unwrap()
  );
}

#[tokio::test]
async fn artifacts_can_be_executed_without_recompiling() {
  let user = "export default function F(): number { return 7; }";
  let harness = synthesize_harness(&[], "number", &[]);

  let program = user_program(user, &harness.text).build();
  let compiler = FakeCompiler::new(program);
  let counter = compiler.counter();
  let runner = Runner::with_options(Box::new(compiler), options());

  let request = CompileRequest {
    user_source: user,
    return_type: "number",
    arg_types: &[],
    aux_files: &[],
  };
  let artifacts = runner.pre_process(&request).await.unwrap().unwrap();
  assert!(artifacts.js_by_name.contains_key("__user_file"));
  assert!(artifacts.js_by_name.contains_key("__execution_harness"));

  let mut sandbox = FakeSandbox::new().script(
    "__execution_harness",
    &["__user_file"],
    ModuleBehavior::SetResult(json!(7)),
  );
  let outcome = runner
    .execute_from_artifacts(&mut sandbox, &EvalContext::new(), &artifacts, &[], None)
    .await
    .unwrap();

  assert_eq!(outcome.unwrap(), json!(7));
  assert_eq!(counter.get(), 1);
}

#[tokio::test]
async fn fileless_diagnostics_off_the_allow_list_abort_the_call() {
  let user = "export default function F(): number { return 1; }";
  let harness = synthesize_harness(&[], "number", &[]);

  let program = user_program(user, &harness.text)
    .diagnostic(Diagnostic::global(5055, "Cannot write file."))
    .build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());

  let request = CompileRequest {
    user_source: user,
    return_type: "number",
    arg_types: &[],
    aux_files: &[],
  };
  let err = runner.pre_process(&request).await.unwrap_err();
  assert!(matches!(err, HostError::GlobalDiagnostic { code: 5055, .. }));
}

#[tokio::test]
async fn benign_fileless_diagnostics_do_not_fail_the_compile() {
  let user = "export default function F(): number { return 1; }";
  let harness = synthesize_harness(&[], "number", &[]);

  let program = user_program(user, &harness.text)
    .diagnostic(Diagnostic::global(1192, "suppression marker"))
    .build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());

  let request = CompileRequest {
    user_source: user,
    return_type: "number",
    arg_types: &[],
    aux_files: &[],
  };
  assert!(runner.pre_process(&request).await.unwrap().is_ok());
}

#[tokio::test]
async fn unknown_import_specifiers_are_embedder_bugs() {
  let user = "export default function F(): number { return 1; }";
  let harness = synthesize_harness(&[], "number", &[]);

  let program = user_program(user, &harness.text).build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let mut sandbox = FakeSandbox::new().script(
    "__execution_harness",
    &["missing_module"],
    ModuleBehavior::Inert,
  );

  let request = CompileRequest {
    user_source: user,
    return_type: "number",
    arg_types: &[],
    aux_files: &[],
  };
  let err = runner
    .execute_user_code(&mut sandbox, &EvalContext::new(), &request, &[], None)
    .await
    .unwrap_err();
  match err {
    HostError::UnresolvedSpecifier {
      specifier,
      referrer,
    } => {
      assert_eq!(specifier, "missing_module");
      assert_eq!(referrer, "__execution_harness");
    }
    other => panic!("unexpected error: {:?}", other),
  }
}

#[tokio::test]
async fn unmapped_harness_diagnostics_are_embedder_bugs() {
  let user = "export default function F(): number { return 1; }";
  let harness = synthesize_harness(&[], "Widget", &[]);

  let program = user_program(user, &harness.text)
    .diagnostic(Diagnostic::new(
      HARNESS_TS,
      harness.anchors.return_type,
      2304,
      "Cannot find name 'Widget'.",
    ))
    .build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());

  let request = CompileRequest {
    user_source: user,
    return_type: "Widget",
    arg_types: &[],
    aux_files: &[],
  };
  let err = runner.pre_process(&request).await.unwrap_err();
  assert!(matches!(
    err,
    HostError::UnmappedHarnessDiagnostic { code: 2304, .. }
  ));
}

#[tokio::test]
async fn unset_result_reads_as_null() {
  let user = "export default function F(): void {}";
  let harness = synthesize_harness(&[], "void", &[]);

  let program = user_program(user, &harness.text).build();
  let runner = Runner::with_options(Box::new(FakeCompiler::new(program)), options());
  let mut sandbox = FakeSandbox::new().script(
    "__execution_harness",
    &["__user_file"],
    ModuleBehavior::Inert,
  );

  let request = CompileRequest {
    user_source: user,
    return_type: "void",
    arg_types: &[],
    aux_files: &[],
  };
  let outcome = runner
    .execute_user_code(&mut sandbox, &EvalContext::new(), &request, &[], None)
    .await
    .unwrap();
  assert_eq!(outcome.unwrap(), serde_json::Value::Null);
}

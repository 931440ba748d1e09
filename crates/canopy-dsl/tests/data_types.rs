//! Type system tests: inheritance, nested defaults, and deep validation
//! paths, driven through whole blueprints.

use anyhow::Result;
use canopy_dsl::parse_yaml_str;
use serde_json::json;

#[test]
fn nested_type_mismatch_reports_full_property_path() {
    // Five levels of data types; the innermost leaf gets a string where an
    // integer is declared.
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  e_type:
    properties:
      f:
        type: integer
  d_type:
    properties:
      e:
        type: e_type
  c_type:
    properties:
      d:
        type: d_type
  b_type:
    properties:
      c:
        type: c_type
  a_type:
    properties:
      b:
        type: b_type
node_types:
  base:
    properties:
      a:
        type: a_type
node_templates:
  vm:
    type: base
    properties:
      a:
        b:
          c:
            d:
              e:
                f: not-a-number
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 50);
    assert!(err
        .to_string()
        .contains("node_templates.vm.properties.a.b.c.d.e.f"));
}

#[test]
fn pair_type_rejects_extra_member() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  pair:
    properties:
      first:
        type: string
      second:
        type: string
node_types:
  base:
    properties:
      endpoints:
        type: pair
node_templates:
  vm:
    type: base
    properties:
      endpoints:
        first: a
        second: b
        third: c
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 106);
    assert!(err.to_string().contains("third"));
}

#[test]
fn pair_type_requires_both_members() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  pair:
    properties:
      first:
        type: string
      second:
        type: string
node_types:
  base:
    properties:
      endpoints:
        type: pair
node_templates:
  vm:
    type: base
    properties:
      endpoints:
        first: a
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 107);
    assert!(err.to_string().contains("second"));
}

#[test]
fn derived_defaults_flow_into_templates() -> Result<()> {
    let plan = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  image:
    properties:
      distribution:
        type: string
        default: ubuntu
      size_gb:
        type: integer
        default: 10
  large_image:
    derived_from: image
    properties:
      size_gb:
        default: 100
node_types:
  host:
    properties:
      image:
        type: large_image
        default: {}
node_templates:
  vm:
    type: host
"#,
    )?;
    let vm = plan.get_node("vm").expect("vm node");
    assert_eq!(
        vm.properties["image"],
        json!({ "distribution": "ubuntu", "size_gb": 100 })
    );
    Ok(())
}

#[test]
fn unknown_type_reference_is_code_39() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  a:
    properties:
      p:
        type: mystery
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 39);
}

#[test]
fn shadowing_a_primitive_is_code_1() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  integer:
    properties: {}
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 1);
}

#[test]
fn default_bearing_reference_cycle_is_code_100() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  infinite_list:
    properties:
      tail:
        type: infinite_list
        default: {}
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 100);
    assert_eq!(err.cycle_path().unwrap(), ["infinite_list", "infinite_list"]);
}

#[test]
fn recursive_type_without_default_compiles_and_validates() -> Result<()> {
    let plan = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  tree:
    properties:
      label:
        type: string
      left:
        type: tree
        required: false
      right:
        type: tree
        required: false
node_types:
  base:
    properties:
      root:
        type: tree
node_templates:
  vm:
    type: base
    properties:
      root:
        label: a
        left:
          label: b
"#,
    )?;
    let vm = plan.get_node("vm").expect("vm node");
    assert_eq!(vm.properties["root"]["left"]["label"], json!("b"));
    assert!(vm.properties["root"].get("right").is_none());
    Ok(())
}

#[test]
fn intrinsic_functions_bypass_static_checks_in_templates() -> Result<()> {
    let plan = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
node_types:
  base:
    properties:
      port:
        type: integer
node_templates:
  vm:
    type: base
    properties:
      port:
        get_input: listen_port
"#,
    )?;
    let vm = plan.get_node("vm").expect("vm node");
    assert_eq!(vm.properties["port"], json!({ "get_input": "listen_port" }));
    Ok(())
}

#[test]
fn derivation_cycle_names_the_offenders() {
    let err = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  a:
    derived_from: b
  b:
    derived_from: a
"#,
    )
    .unwrap_err();
    assert_eq!(err.code(), 100);
    let names = err.cycle_path().expect("cycle path");
    assert_eq!(names.first(), names.last());
    assert!(names.contains(&"a".to_string()));
}

#[test]
fn data_type_records_carry_metadata() -> Result<()> {
    let plan = parse_yaml_str(
        r#"
definitions_version: canopy_dsl_1_2
data_types:
  image:
    description: machine image selection
    version: "2.1"
    properties:
      distribution:
        type: string
        default: ubuntu
"#,
    )?;
    let image = &plan.data_types["image"];
    assert_eq!(image["description"], json!("machine image selection"));
    assert_eq!(image["version"], json!("2.1"));
    assert_eq!(
        image["properties"]["distribution"]["default"],
        json!("ubuntu")
    );
    Ok(())
}

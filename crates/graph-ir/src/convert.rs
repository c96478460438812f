// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Interchange → native conversion.
//!
//! Initializers and `Constant` nodes become `GivenTensorFill` operators in
//! the init net; every other node maps one-to-one onto a native operator.
//! Nodes without a native counterpart fail the conversion.

use crate::builder::OpBuilder;
use crate::onnx::{self, ModelProto, NodeProto, TensorProto};
use crate::proto::{NetDef, OperatorDef};
use crate::GraphError;
use std::collections::HashSet;
use tensor_core::{DType, Shape, Tensor};

/// Converts an interchange model into `(init, predict)` native nets.
pub fn convert_model(model: &ModelProto) -> Result<(NetDef, NetDef), GraphError> {
    let graph = model.graph.as_ref().ok_or(GraphError::MissingGraph)?;

    let mut init = NetDef {
        name: format!("{}_init", graph.name),
        ..Default::default()
    };
    let mut predict = NetDef {
        name: graph.name.clone(),
        ..Default::default()
    };

    for tensor in &graph.initializer {
        init.op.push(fill_op(tensor, &tensor.name)?);
        init.external_output.push(tensor.name.clone());
    }

    for node in &graph.node {
        if node.op_type == "Constant" {
            let output = node.output.first().ok_or_else(|| GraphError::InvalidAttribute {
                node: node.name.clone(),
                detail: "Constant has no output".into(),
            })?;
            let value = node
                .attr("value")
                .and_then(|a| a.t.as_ref())
                .ok_or_else(|| GraphError::InvalidAttribute {
                    node: node.name.clone(),
                    detail: "Constant requires a tensor 'value'".into(),
                })?;
            init.op.push(fill_op(value, output)?);
            init.external_output.push(output.clone());
            continue;
        }
        predict.op.push(convert_node(node)?);
    }

    let mut seen = HashSet::new();
    for name in graph
        .input
        .iter()
        .map(|v| &v.name)
        .chain(init.external_output.iter())
    {
        if seen.insert(name.clone()) {
            predict.external_input.push(name.clone());
        }
    }
    predict.external_output = graph.output.iter().map(|v| v.name.clone()).collect();

    tracing::info!(
        producer = %model.producer_name,
        nodes = graph.node.len(),
        initializers = graph.initializer.len(),
        "converted interchange model"
    );
    Ok((init, predict))
}

fn convert_node(node: &NodeProto) -> Result<OperatorDef, GraphError> {
    if !node.domain.is_empty() && node.domain != "ai.onnx" {
        return Err(unsupported(node));
    }
    let op = match node.op_type.as_str() {
        "Identity" => base(node, "Copy"),
        "Flatten" => base(node, "Flatten").arg_int("axis", node.attr_int("axis", 1)),
        "Reshape" => base(node, "Reshape"),
        "Gemm" => {
            let trans_a = node.attr_int("transA", 0);
            let trans_b = node.attr_int("transB", 0);
            let alpha = node.attr_float("alpha", 1.0);
            let beta = node.attr_float("beta", 1.0);
            if trans_a != 0 || trans_b != 1 || alpha != 1.0 || beta != 1.0 {
                return Err(GraphError::InvalidAttribute {
                    node: node.name.clone(),
                    detail: format!(
                        "Gemm supported only as transA=0 transB=1 alpha=1 beta=1 \
                         (got transA={trans_a} transB={trans_b} alpha={alpha} beta={beta})"
                    ),
                });
            }
            base(node, "FC")
        }
        "MatMul" => base(node, "MatMul"),
        "Softmax" => base(node, "Softmax").arg_int("axis", node.attr_int("axis", 1)),
        "Relu" => base(node, "Relu"),
        "Add" => base(node, "Add"),
        "Mul" => base(node, "Mul"),
        "Sum" => base(node, "Sum"),
        "GlobalAveragePool" => base(node, "AveragePool").arg_int("global_pooling", 1),
        "Cast" => {
            let to = node.attr("to").map(|a| a.i).ok_or_else(|| GraphError::InvalidAttribute {
                node: node.name.clone(),
                detail: "Cast requires 'to'".into(),
            })?;
            let dtype = i32::try_from(to)
                .ok()
                .and_then(onnx::elem_to_dtype)
                .ok_or(GraphError::UnknownElemType(to as i32))?;
            base(node, "Cast").arg_int("to", i64::from(dtype.tag()))
        }
        _ => return Err(unsupported(node)),
    };
    Ok(op.build())
}

fn base(node: &NodeProto, op_type: &str) -> OpBuilder {
    let mut op = OpBuilder::new(op_type).name(&node.name);
    for input in node.input.iter().filter(|i| !i.is_empty()) {
        op = op.input(input);
    }
    for output in &node.output {
        op = op.output(output);
    }
    op
}

fn unsupported(node: &NodeProto) -> GraphError {
    GraphError::UnsupportedOp {
        op_type: node.op_type.clone(),
        node: node.name.clone(),
    }
}

fn fill_op(tensor: &TensorProto, output: &str) -> Result<OperatorDef, GraphError> {
    let invalid = |detail: String| GraphError::InvalidTensor {
        name: output.to_string(),
        detail,
    };
    let dtype = onnx::elem_to_dtype(tensor.data_type)
        .ok_or(GraphError::UnknownElemType(tensor.data_type))?;
    let shape = Shape::from_i64(&tensor.dims).map_err(|e| invalid(e.to_string()))?;
    let bytes = payload_bytes(tensor, dtype);
    let value = Tensor::from_bytes(shape, dtype, &bytes).map_err(|e| invalid(e.to_string()))?;
    Ok(OpBuilder::given_tensor_fill(output, &value)
        .name(output)
        .build())
}

/// Little-endian bytes of a tensor payload, from `raw_data` when present,
/// otherwise from the typed field the interchange format uses for `dtype`.
fn payload_bytes(tensor: &TensorProto, dtype: DType) -> Vec<u8> {
    if !tensor.raw_data.is_empty() {
        return tensor.raw_data.clone();
    }
    let width = dtype.size_bytes();
    match dtype {
        DType::F32 => tensor.float_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        DType::F64 => tensor.double_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        DType::I64 => tensor.int64_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        DType::U32 | DType::U64 => tensor
            .uint64_data
            .iter()
            .flat_map(|v| v.to_le_bytes()[..width].to_vec())
            .collect(),
        // Narrow types (and float16 bit patterns) travel in int32_data.
        _ => tensor
            .int32_data
            .iter()
            .flat_map(|v| v.to_le_bytes()[..width.min(4)].to_vec())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onnx::{elem, AttributeProto, GraphProto, ValueInfoProto};

    fn node(op_type: &str, inputs: &[&str], outputs: &[&str]) -> NodeProto {
        NodeProto {
            op_type: op_type.into(),
            name: format!("{op_type}_0"),
            input: inputs.iter().map(|s| s.to_string()).collect(),
            output: outputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn int_attr(name: &str, i: i64) -> AttributeProto {
        AttributeProto {
            name: name.into(),
            i,
            ..Default::default()
        }
    }

    fn value_info(name: &str) -> ValueInfoProto {
        ValueInfoProto { name: name.into() }
    }

    fn model(nodes: Vec<NodeProto>, initializer: Vec<TensorProto>) -> ModelProto {
        ModelProto {
            ir_version: 7,
            producer_name: "test".into(),
            graph: Some(GraphProto {
                name: "g".into(),
                node: nodes,
                initializer,
                input: vec![value_info("x")],
                output: vec![value_info("y")],
            }),
        }
    }

    fn gemm() -> NodeProto {
        let mut n = node("Gemm", &["x", "W", "B"], &["h"]);
        n.attribute.push(int_attr("transB", 1));
        n
    }

    fn weights() -> Vec<TensorProto> {
        vec![
            TensorProto {
                name: "W".into(),
                dims: vec![2, 3],
                data_type: elem::FLOAT,
                float_data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                ..Default::default()
            },
            TensorProto {
                name: "B".into(),
                dims: vec![2],
                data_type: elem::FLOAT,
                raw_data: [0.5f32, -0.5].iter().flat_map(|v| v.to_le_bytes()).collect(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_convert_gemm_relu() {
        let m = model(vec![gemm(), node("Relu", &["h"], &["y"])], weights());
        let (init, predict) = convert_model(&m).unwrap();

        assert_eq!(init.op.len(), 2);
        assert!(init.op.iter().all(|op| op.r#type == "GivenTensorFill"));
        assert_eq!(init.op[0].arg_ints("shape"), Some(&[2i64, 3][..]));
        assert_eq!(init.op[1].arg_bytes("values").map(<[u8]>::len), Some(8));

        let types: Vec<_> = predict.op.iter().map(|op| op.r#type.as_str()).collect();
        assert_eq!(types, vec!["FC", "Relu"]);
        assert_eq!(predict.external_input, vec!["x", "W", "B"]);
        assert_eq!(predict.external_output, vec!["y"]);
    }

    #[test]
    fn test_listed_initializers_not_duplicated() {
        let mut m = model(vec![gemm(), node("Relu", &["h"], &["y"])], weights());
        if let Some(g) = m.graph.as_mut() {
            g.input.push(value_info("W"));
        }
        let (_, predict) = convert_model(&m).unwrap();
        assert_eq!(predict.external_input, vec!["x", "W", "B"]);
    }

    #[test]
    fn test_gemm_without_trans_b_rejected() {
        let m = model(vec![node("Gemm", &["x", "W", "B"], &["y"])], weights());
        assert!(matches!(
            convert_model(&m),
            Err(GraphError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_unsupported_op() {
        let m = model(vec![node("Conv", &["x", "W"], &["y"])], weights());
        let err = convert_model(&m).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedOp { ref op_type, .. } if op_type == "Conv"));
    }

    #[test]
    fn test_missing_graph() {
        let m = ModelProto::default();
        assert!(matches!(convert_model(&m), Err(GraphError::MissingGraph)));
    }

    #[test]
    fn test_int8_initializer_narrowed() {
        let t = TensorProto {
            name: "q".into(),
            dims: vec![2],
            data_type: elem::INT8,
            int32_data: vec![-1, 2],
            ..Default::default()
        };
        let op = fill_op(&t, "q").unwrap();
        assert_eq!(op.arg_bytes("values"), Some(&[0xff, 0x02][..]));
        assert_eq!(op.arg_int("dtype"), Some(i64::from(DType::I8.tag())));
    }

    #[test]
    fn test_initializer_payload_length_checked() {
        let t = TensorProto {
            name: "bad".into(),
            dims: vec![3],
            data_type: elem::FLOAT,
            float_data: vec![1.0],
            ..Default::default()
        };
        assert!(matches!(fill_op(&t, "bad"), Err(GraphError::InvalidTensor { .. })));
    }

    #[test]
    fn test_constant_and_cast() {
        let mut constant = node("Constant", &[], &["k"]);
        constant.attribute.push(AttributeProto {
            name: "value".into(),
            t: Some(TensorProto {
                dims: vec![1],
                data_type: elem::INT64,
                int64_data: vec![42],
                ..Default::default()
            }),
            ..Default::default()
        });
        let mut cast = node("Cast", &["x"], &["y"]);
        cast.attribute.push(int_attr("to", i64::from(elem::INT64)));

        let (init, predict) = convert_model(&model(vec![constant, cast], vec![])).unwrap();
        assert_eq!(init.op.len(), 1);
        assert_eq!(init.op[0].output, vec!["k"]);
        assert_eq!(predict.op[0].r#type, "Cast");
        assert_eq!(predict.op[0].arg_int("to"), Some(i64::from(DType::I64.tag())));
        assert_eq!(predict.external_input, vec!["x", "k"]);
    }

    #[test]
    fn test_global_average_pool_and_flatten() {
        let mut flatten = node("Flatten", &["p"], &["y"]);
        flatten.attribute.push(int_attr("axis", 1));
        let m = model(vec![node("GlobalAveragePool", &["x"], &["p"]), flatten], vec![]);
        let (_, predict) = convert_model(&m).unwrap();
        assert_eq!(predict.op[0].r#type, "AveragePool");
        assert_eq!(predict.op[0].arg_int("global_pooling"), Some(1));
        assert_eq!(predict.op[1].arg_int("axis"), Some(1));
    }
}

use super::{
    BOXES_OUTPUT, BackendOptions, ClassOutput, DetectionBackend, ENTITIES_OUTPUT,
    ExecutionProvider, LABELS_OUTPUT, RawDetections, SCORES_OUTPUT,
};
use anyhow::Context;
use ndarray::{Array4, ArrayD, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel, builder::SessionBuilder},
    value::{DynValue, TensorRef},
};

pub struct OrtBackend {
    session: Session,
    input_name: String,
}

impl OrtBackend {
    fn with_provider(
        builder: SessionBuilder,
        provider: ExecutionProvider,
    ) -> anyhow::Result<SessionBuilder> {
        match provider {
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
                Ok(builder)
            }
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                Ok(builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?)
            }
            #[cfg(not(feature = "cuda"))]
            ExecutionProvider::Cuda => {
                anyhow::bail!("CUDA execution provider requested but the `cuda` feature is disabled")
            }
        }
    }
}

impl DetectionBackend for OrtBackend {
    fn load_model(path: &str, options: &BackendOptions) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads)?;

        let session = Self::with_provider(builder, options.execution_provider)?
            .commit_from_file(path)
            .with_context(|| format!("failed to load model from {}", path))?;

        tracing::info!(path, input = %options.input_name, "Model loaded");
        Ok(Self {
            session,
            input_name: options.input_name.clone(),
        })
    }

    fn detect(&mut self, images: &Array4<f32>) -> anyhow::Result<RawDetections> {
        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(images.view().into_dyn())?
        ])?;

        // Exports that keep the string table emit entity names directly.
        let classes = match outputs.get(ENTITIES_OUTPUT) {
            Some(value) => ClassOutput::Entities(read_strings(value, ENTITIES_OUTPUT)?),
            None => ClassOutput::Indices(read_array::<i64>(
                require(outputs.get(LABELS_OUTPUT), LABELS_OUTPUT)?,
                LABELS_OUTPUT,
            )?),
        };

        Ok(RawDetections {
            boxes: read_array::<f32>(
                require(outputs.get(BOXES_OUTPUT), BOXES_OUTPUT)?,
                BOXES_OUTPUT,
            )?,
            scores: read_array::<f32>(
                require(outputs.get(SCORES_OUTPUT), SCORES_OUTPUT)?,
                SCORES_OUTPUT,
            )?,
            classes,
        })
    }
}

fn require<'v>(value: Option<&'v DynValue>, name: &str) -> anyhow::Result<&'v DynValue> {
    value.with_context(|| format!("model has no output named `{}`", name))
}

fn read_array<T>(value: &DynValue, name: &str) -> anyhow::Result<ArrayD<T>>
where
    T: ort::tensor::PrimitiveTensorElementType + Clone + std::fmt::Debug,
{
    let array = value
        .try_extract_array::<T>()
        .with_context(|| format!("unexpected element type for output `{}`", name))?;
    Ok(array.into_owned())
}

fn read_strings(value: &DynValue, name: &str) -> anyhow::Result<ArrayD<String>> {
    let (shape, strings) = value
        .try_extract_strings()
        .with_context(|| format!("output `{}` is not a string tensor", name))?;
    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("output `{}` has a negative dimension", name))?;
    ArrayD::from_shape_vec(IxDyn(&dims), strings)
        .with_context(|| format!("output `{}` does not match its shape {:?}", name, dims))
}

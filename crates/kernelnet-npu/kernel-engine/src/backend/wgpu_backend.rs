// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Backend
//!
//! GPU-accelerated backend using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! All kernels of a network are lowered into a single WGSL module (one
//! `@compute` entry point per kernel) sharing one bind group:
//!
//! | binding | argument | access |
//! |---------|----------|--------|
//! | 0 | `input`  | read |
//! | 1 | `output` | read_write |
//! | 2 | `x`      | read_write |
//! | 3 | `rate`   | read |
//! | 4 | `target` | read |
//!
//! Every kernel runs as a single invocation: the generated statements are
//! strictly sequential, and parallelism across kernels is not allowed anyway.
//! WGSL has no zero-sized storage arrays, so empty arguments get a one-element
//! placeholder buffer.

use super::ComputeBackend;
use crate::dialect::{KernelIr, SourceDialect};
use crate::error::{EngineError, Result};
use crate::kernel::{KernelHandle, KernelSource};
use kernelnet_neural::Value;
use tracing::{debug, error, info};

const BINDING_COUNT: u32 = 5;
const READ_ONLY_BINDINGS: [bool; BINDING_COUNT as usize] = [true, false, false, true, true];

/// WGPU backend for GPU acceleration
pub struct WgpuBackend {
    /// Backend name for logging
    name: String,

    /// WGPU device
    device: wgpu::Device,

    /// WGPU command queue
    queue: wgpu::Queue,

    /// Layout shared by every kernel pipeline
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,

    /// One pipeline per kernel of the last built program, indexed by handle
    pipelines: Vec<(String, wgpu::ComputePipeline)>,

    /// Argument buffers
    buffers: WgpuBuffers,

    /// Rebuilt lazily whenever an argument buffer is replaced
    bind_group: Option<wgpu::BindGroup>,
}

/// Device copies of the five kernel arguments
#[derive(Default)]
struct WgpuBuffers {
    input: Option<wgpu::Buffer>,
    output: Option<wgpu::Buffer>,
    memory: Option<wgpu::Buffer>,
    rate: Option<wgpu::Buffer>,
    target: Option<wgpu::Buffer>,
}

impl WgpuBackend {
    /// Create a new WGPU backend on the high-performance adapter
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            EngineError::AccelerationUnavailable("Failed to find WGPU adapter".to_string())
        })?;

        let adapter_info = adapter.get_info();
        let backend_name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("KernelNet Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| {
            EngineError::AccelerationUnavailable(format!("Failed to create device: {}", e))
        })?;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = READ_ONLY_BINDINGS
            .iter()
            .enumerate()
            .map(|(binding, &read_only)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kernel Arguments Layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        info!(backend = %backend_name, "WGPU backend initialized");

        Ok(Self {
            name: backend_name,
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            pipelines: Vec::new(),
            buffers: WgpuBuffers::default(),
            bind_group: None,
        })
    }

    /// Lower canonical kernels into one WGSL module
    fn lower_program(kernels: &[KernelSource<'_>]) -> Result<String> {
        let mut module = SourceDialect::Wgsl.module_prelude();
        for kernel in kernels {
            let ir = KernelIr::parse(*kernel)?;
            module.push_str(&ir.render(SourceDialect::Wgsl));
            module.push('\n');
        }
        Ok(module)
    }

    /// New storage buffer holding `data` (at least one element)
    fn storage_buffer(&self, label: &str, data: &[Value]) -> wgpu::Buffer {
        let len = data.len().max(1);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (len * std::mem::size_of::<Value>()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        if !data.is_empty() {
            self.queue.write_buffer(&buffer, 0, bytemuck::cast_slice(data));
        }
        buffer
    }

    fn create_bind_group(&self) -> Result<wgpu::BindGroup> {
        let buffers = [
            &self.buffers.input,
            &self.buffers.output,
            &self.buffers.memory,
            &self.buffers.rate,
            &self.buffers.target,
        ];
        let mut entries = Vec::with_capacity(buffers.len());
        for (binding, buffer) in buffers.iter().enumerate() {
            let buffer = buffer.as_ref().ok_or(EngineError::NotBuilt)?;
            entries.push(wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            });
        }

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Arguments"),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    /// Blocking copy of the first `len` values of `buffer` to the host
    fn download(&self, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<Value>> {
        let size = (len * std::mem::size_of::<Value>()) as u64;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| EngineError::Dispatch("Failed to receive buffer map result".to_string()))?
            .map_err(|e| EngineError::Dispatch(format!("Failed to map buffer: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<Value> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging_buffer.unmap();

        Ok(values)
    }

    fn replace_buffer(slot: &mut Option<wgpu::Buffer>, buffer: wgpu::Buffer) {
        if let Some(old) = slot.replace(buffer) {
            old.destroy();
        }
    }
}

impl ComputeBackend for WgpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn is_accelerated(&self) -> bool {
        true
    }

    fn build_program(&mut self, kernels: &[KernelSource<'_>]) -> Result<()> {
        self.pipelines.clear();
        let module = Self::lower_program(kernels)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Network Kernels"),
                source: wgpu::ShaderSource::Wgsl(module.into()),
            });
        let pipelines: Vec<(String, wgpu::ComputePipeline)> = kernels
            .iter()
            .map(|kernel| {
                let pipeline =
                    self.device
                        .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                            label: Some(kernel.entry_point),
                            layout: Some(&self.pipeline_layout),
                            module: &shader,
                            entry_point: kernel.entry_point,
                        });
                (kernel.entry_point.to_string(), pipeline)
            })
            .collect();

        if let Some(validation) = pollster::block_on(self.device.pop_error_scope()) {
            let diagnostics = validation.to_string();
            error!(diagnostics = %diagnostics, "WGSL program rejected");
            return Err(EngineError::BuildFailure { diagnostics });
        }

        debug!(kernels = pipelines.len(), "WGSL program built");
        self.pipelines = pipelines;
        Ok(())
    }

    fn kernel_handle(&self, entry_point: &str) -> Result<KernelHandle> {
        if self.pipelines.is_empty() {
            return Err(EngineError::NotBuilt);
        }
        self.pipelines
            .iter()
            .position(|(name, _)| name == entry_point)
            .map(KernelHandle::new)
            .ok_or_else(|| EngineError::UnknownKernel(entry_point.to_string()))
    }

    fn upload_memory(&mut self, memory: &[Value]) -> Result<()> {
        let buffer = self.storage_buffer("Memory Arena", memory);
        Self::replace_buffer(&mut self.buffers.memory, buffer);
        self.bind_group = None;
        Ok(())
    }

    fn stage_feed_arguments(&mut self, inputs: &[Value], outputs_len: usize) -> Result<()> {
        let input = self.storage_buffer("Feed Input", inputs);
        let output = self.storage_buffer("Feed Output", &vec![0.0; outputs_len]);
        Self::replace_buffer(&mut self.buffers.input, input);
        Self::replace_buffer(&mut self.buffers.output, output);

        if self.buffers.rate.is_none() {
            self.buffers.rate = Some(self.storage_buffer("Train Rate", &[]));
        }
        if self.buffers.target.is_none() {
            self.buffers.target = Some(self.storage_buffer("Train Target", &[]));
        }
        self.bind_group = None;
        Ok(())
    }

    fn stage_train_arguments(&mut self, rate: Value, targets: &[Value]) -> Result<()> {
        let rate = self.storage_buffer("Train Rate", &[rate]);
        let target = self.storage_buffer("Train Target", targets);
        Self::replace_buffer(&mut self.buffers.rate, rate);
        Self::replace_buffer(&mut self.buffers.target, target);

        if self.buffers.input.is_none() {
            self.buffers.input = Some(self.storage_buffer("Feed Input", &[]));
        }
        if self.buffers.output.is_none() {
            self.buffers.output = Some(self.storage_buffer("Feed Output", &[]));
        }
        self.bind_group = None;
        Ok(())
    }

    fn enqueue(&mut self, kernel: KernelHandle) -> Result<()> {
        if self.bind_group.is_none() {
            self.bind_group = Some(self.create_bind_group()?);
        }
        let bind_group = self.bind_group.as_ref().ok_or(EngineError::NotBuilt)?;
        let (entry_point, pipeline) = self
            .pipelines
            .get(kernel.index())
            .ok_or(EngineError::NotBuilt)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(entry_point.as_str()),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(entry_point.as_str()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);
            compute_pass.dispatch_workgroups(1, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));

        if let Some(validation) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(EngineError::Dispatch(format!(
                "{} rejected: {}",
                entry_point, validation
            )));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn read_outputs(&mut self, outputs: &mut [Value]) -> Result<()> {
        if outputs.is_empty() {
            return Ok(());
        }
        let buffer = self.buffers.output.as_ref().ok_or(EngineError::NotBuilt)?;
        let values = self.download(buffer, outputs.len())?;
        outputs.copy_from_slice(&values);
        Ok(())
    }

    fn read_memory(&mut self, memory: &mut [Value]) -> Result<()> {
        if memory.is_empty() {
            return Ok(());
        }
        let buffer = self.buffers.memory.as_ref().ok_or(EngineError::NotBuilt)?;
        let values = self.download(buffer, memory.len())?;
        memory.copy_from_slice(&values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelPass;

    #[test]
    fn test_wgpu_backend_creation() {
        // This test requires a GPU - may not work in CI
        if let Ok(backend) = WgpuBackend::new() {
            assert!(backend.backend_name().contains("WGPU"));
            assert!(matches!(
                backend.kernel_handle("feed_0"),
                Err(EngineError::NotBuilt)
            ));
        }
    }

    #[test]
    fn test_lowered_module_declares_every_entry_point() {
        let t = kernelnet_neural::value_type_name();
        let feed = format!(
            "void kernel feed_0(global const {t} *input, global {t} *output, global {t} *x) {{\nx[0] = input[0];\noutput[0] = x[0];\n}}\n",
            t = t
        );
        let train = format!(
            "void kernel train_0(global const {t} *rate, global const {t} *target, global {t} *x) {{\nx[1] = target[0] * rate[0];\n}}\n",
            t = t
        );
        let kernels = [
            KernelSource {
                pass: KernelPass::Feed,
                entry_point: "feed_0",
                source: &feed,
            },
            KernelSource {
                pass: KernelPass::Train,
                entry_point: "train_0",
                source: &train,
            },
        ];

        let module = WgpuBackend::lower_program(&kernels).unwrap();
        assert!(module.contains("fn feed_0() {\nx[0] = input[0];\noutput[0] = x[0];\n}\n"));
        assert!(module.contains("fn train_0() {\nx[1] = target_values[0] * rate[0];\n}\n"));
        assert_eq!(module.matches("@binding(").count(), BINDING_COUNT as usize);
    }
}

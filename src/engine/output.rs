use anyhow::{Result, anyhow};
use cpal::{
    SampleFormat, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use super::poly::SharedPool;

const OUTPUT_CEILING: f32 = 0.98;

pub struct AudioOutput {
    _stream: Stream,
    sample_rate: u32,
}

impl AudioOutput {
    pub fn start(pool: SharedPool) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0;
        {
            let mut guard = pool
                .lock()
                .map_err(|_| anyhow!("voice pool lock poisoned"))?;
            guard.set_sample_rate(sample_rate as f32);
        }
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream(&device, &config, pool, |sample| sample)?,
            SampleFormat::I16 => build_stream(&device, &config, pool, |sample| {
                (sample * i16::MAX as f32) as i16
            })?,
            SampleFormat::U16 => build_stream(&device, &config, pool, |sample| {
                let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
                (scaled * u16::MAX as f32) as u16
            })?,
            other => {
                log::warn!(target: "engine", "unsupported sample format {other:?}, trying f32");
                build_stream(&device, &config, pool, |sample| sample)?
            }
        };
        stream.play()?;
        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    pool: SharedPool,
    convert: F,
) -> Result<Stream>
where
    T: cpal::SizedSample + Default + Send + 'static,
    F: Fn(f32) -> T + Send + 'static,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| fill_output_buffer(output, channels, &pool, &convert),
        move |err| log::warn!(target: "engine", "audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T, F>(output: &mut [T], channels: usize, pool: &SharedPool, convert: &F)
where
    T: Copy + Default,
    F: Fn(f32) -> T,
{
    let Ok(mut pool) = pool.lock() else {
        output.fill(T::default());
        return;
    };
    for frame in output.chunks_mut(channels) {
        let sample = pool.next_sample().clamp(-OUTPUT_CEILING, OUTPUT_CEILING);
        let value = convert(sample);
        for channel in frame {
            *channel = value;
        }
    }
}

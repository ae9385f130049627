use crate::types::Candle;
use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use num_traits::ToPrimitive;
use plotters::prelude::*;
use std::io::Cursor;

const UP_COLOR: RGBColor = RGBColor(38, 166, 154);
const DOWN_COLOR: RGBColor = RGBColor(239, 83, 80);
const LINE_COLOR: RGBColor = RGBColor(33, 150, 243);
const BACKGROUND: RGBColor = RGBColor(19, 23, 34);

/// K线图渲染
pub trait ChartRenderer: Send + Sync {
    /// 按时间升序的K线渲染为 PNG
    fn render(&self, candles: &[Candle]) -> Result<Vec<u8>>;
}

pub struct PlottersChartRenderer {
    width: u32,
    height: u32,
}

impl PlottersChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn draw(&self, candles: &[Candle], buffer: &mut [u8]) -> Result<()> {
        let closes: Vec<f64> = candles.iter().map(|c| decimal_to_f64(c.close)).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| decimal_to_f64(c.volume)).collect();
        let (price_min, price_max) = padded_range(&closes);
        let volume_max = volumes.iter().cloned().fold(0.0_f64, f64::max).max(f64::EPSILON);
        let x_max = candles.len() as f64;

        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&BACKGROUND).map_err(|e| anyhow!("绘图失败: {}", e))?;

        let (upper, lower) = root.split_vertically((self.height * 3 / 4) as i32);

        let mut price_chart = ChartBuilder::on(&upper)
            .margin(12)
            .build_cartesian_2d(0.0..x_max, price_min..price_max)
            .map_err(|e| anyhow!("价格区域创建失败: {}", e))?;

        price_chart
            .draw_series(LineSeries::new(
                closes.iter().enumerate().map(|(i, close)| (i as f64 + 0.5, *close)),
                LINE_COLOR.stroke_width(2),
            ))
            .map_err(|e| anyhow!("价格曲线绘制失败: {}", e))?;

        let mut volume_chart = ChartBuilder::on(&lower)
            .margin(12)
            .build_cartesian_2d(0.0..x_max, 0.0..volume_max)
            .map_err(|e| anyhow!("成交量区域创建失败: {}", e))?;

        volume_chart
            .draw_series(candles.iter().zip(&volumes).enumerate().map(|(i, (candle, volume))| {
                let color = if candle.close >= candle.open { UP_COLOR } else { DOWN_COLOR };
                let x = i as f64;
                Rectangle::new([(x + 0.1, 0.0), (x + 0.9, *volume)], color.filled())
            }))
            .map_err(|e| anyhow!("成交量绘制失败: {}", e))?;

        root.present().map_err(|e| anyhow!("绘图输出失败: {}", e))?;
        Ok(())
    }
}

impl Default for PlottersChartRenderer {
    fn default() -> Self {
        Self::new(800, 500)
    }
}

impl ChartRenderer for PlottersChartRenderer {
    fn render(&self, candles: &[Candle]) -> Result<Vec<u8>> {
        if candles.is_empty() {
            return Err(anyhow!("没有可绘制的K线数据"));
        }

        let mut buffer = vec![0u8; (self.width * self.height * 3) as usize];
        self.draw(candles, &mut buffer)?;

        let image = RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_else(|| anyhow!("图像缓冲区尺寸不匹配"))?;

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

fn decimal_to_f64(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// 价格区间上下各留 5%，价格不变时按自身量级扩展
fn padded_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else if min.abs() > 0.0 {
        min.abs() * 0.05
    } else {
        1.0
    };

    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn candles(closes: &[Decimal]) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(closes.len() as i64 * 5);
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                token0_address: "0x1::supra_coin::SupraCoin".to_string(),
                token1_address: "0xabc::memecoins::SPIKE".to_string(),
                timeframe: "5m".to_string(),
                timestamp: start + Duration::minutes(i as i64 * 5),
                open: dec!(1),
                high: (*close).max(dec!(1)),
                low: (*close).min(dec!(1)),
                close: *close,
                volume: Decimal::from(i as i64 + 1),
                trade_count: None,
            })
            .collect()
    }

    #[test]
    fn test_render_produces_png() {
        let renderer = PlottersChartRenderer::new(200, 120);
        let png = renderer
            .render(&candles(&[dec!(1.0), dec!(1.2), dec!(0.9), dec!(1.1)]))
            .unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_render_flat_prices() {
        let renderer = PlottersChartRenderer::new(120, 80);
        let png = renderer.render(&candles(&[dec!(2), dec!(2), dec!(2)])).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_render_rejects_empty_input() {
        assert!(PlottersChartRenderer::default().render(&[]).is_err());
    }

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range(&[1.0, 3.0]);
        assert!((lo - 0.9).abs() < 1e-9 && (hi - 3.1).abs() < 1e-9);
        assert_eq!(padded_range(&[0.0, 0.0]), (-1.0, 1.0));
        let (lo, hi) = padded_range(&[2.0]);
        assert!(lo < 2.0 && hi > 2.0);
    }
}

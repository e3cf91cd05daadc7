use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;

use crate::error::{ProbeFlowError, Result};

/// 动作服务所操作的桌面
///
/// 调用是阻塞的，服务会在异步运行时之外执行它们
pub trait Desktop: Send + Sync + 'static {
    /// 移动指针到 (x, y) 并左键单击
    fn click(&self, x: u32, y: u32) -> Result<()>;

    /// 按整格滚动；`dy` 为正向下
    fn scroll(&self, dx: i32, dy: i32) -> Result<()>;

    fn type_text(&self, text: &str) -> Result<()>;

    fn press_key(&self, key: &str) -> Result<()>;

    fn capture(&self) -> Result<DynamicImage>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesktopEvent {
    Click { x: u32, y: u32 },
    Scroll { dx: i32, dy: i32 },
    Type(String),
    Key(String),
    Capture,
}

struct Screen {
    events: Vec<DesktopEvent>,
    scroll_offset: i64,
}

/// 记录所有事件的内存桌面
///
/// 每次截图的画面取决于滚动位置和事件数量，因此相邻截图互不相同
pub struct HeadlessDesktop {
    width: u32,
    height: u32,
    screen: Mutex<Screen>,
}

impl HeadlessDesktop {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            screen: Mutex::new(Screen {
                events: Vec::new(),
                scroll_offset: 0,
            }),
        }
    }

    pub fn events(&self) -> Vec<DesktopEvent> {
        self.screen.lock().events.clone()
    }

    pub fn scroll_offset(&self) -> i64 {
        self.screen.lock().scroll_offset
    }

    fn record(&self, event: DesktopEvent) {
        self.screen.lock().events.push(event);
    }
}

impl Default for HeadlessDesktop {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

impl Desktop for HeadlessDesktop {
    fn click(&self, x: u32, y: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(ProbeFlowError::Actuator(format!(
                "({x}, {y}) is outside the {}x{} screen",
                self.width, self.height
            )));
        }
        self.record(DesktopEvent::Click { x, y });
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        let mut screen = self.screen.lock();
        screen.scroll_offset += i64::from(dy);
        screen.events.push(DesktopEvent::Scroll { dx, dy });
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        self.record(DesktopEvent::Type(text.to_string()));
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(ProbeFlowError::Actuator("empty key name".to_string()));
        }
        self.record(DesktopEvent::Key(key.to_string()));
        Ok(())
    }

    fn capture(&self) -> Result<DynamicImage> {
        let (offset, seen) = {
            let mut screen = self.screen.lock();
            screen.events.push(DesktopEvent::Capture);
            (screen.scroll_offset, screen.events.len())
        };
        let shade = (seen % 256) as u8;
        let frame = RgbImage::from_fn(self.width, self.height, |x, y| {
            let row = (i64::from(y) + offset * 10).rem_euclid(256) as u8;
            Rgb([row, (x % 256) as u8, shade])
        });
        Ok(DynamicImage::ImageRgb8(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_click_fails() {
        let desktop = HeadlessDesktop::new(100, 50);
        assert!(desktop.click(100, 10).is_err());
        assert!(desktop.click(99, 49).is_ok());
        assert_eq!(desktop.events(), vec![DesktopEvent::Click { x: 99, y: 49 }]);
    }

    #[test]
    fn scrolling_moves_the_offset() {
        let desktop = HeadlessDesktop::new(10, 10);
        desktop.scroll(0, 3).unwrap();
        desktop.scroll(0, -1).unwrap();
        assert_eq!(desktop.scroll_offset(), 2);
    }

    #[test]
    fn capture_matches_screen_size() {
        let desktop = HeadlessDesktop::new(32, 16);
        let frame = desktop.capture().unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 16));
        assert_eq!(desktop.events(), vec![DesktopEvent::Capture]);
    }
}

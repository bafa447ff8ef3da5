use std::time::Duration;
use uinput::device::Device;
use uinput::event::keyboard;

use crate::types::NUM_CLASSES;

/// Tecla correspondiente a un dígito 0-9
fn digit_key(digit: usize) -> Option<keyboard::Key> {
    use keyboard::Key;

    match digit {
        0 => Some(Key::_0),
        1 => Some(Key::_1),
        2 => Some(Key::_2),
        3 => Some(Key::_3),
        4 => Some(Key::_4),
        5 => Some(Key::_5),
        6 => Some(Key::_6),
        7 => Some(Key::_7),
        8 => Some(Key::_8),
        9 => Some(Key::_9),
        _ => None,
    }
}

/// Teclado virtual sobre /dev/uinput que escribe los dígitos decididos
pub struct HidOutput {
    dev: Device,
}

impl HidOutput {
    pub fn new() -> Result<Self, uinput::Error> {
        let dev = uinput::default()?
            .name("numeroscopio-hid")?
            .event(uinput::event::Keyboard::All)?
            .create()?;

        Ok(HidOutput { dev })
    }

    fn sync(&mut self) -> Result<(), uinput::Error> {
        self.dev.synchronize()
    }

    fn key_tap(&mut self, key: keyboard::Key) -> Result<(), uinput::Error> {
        self.dev.press(&keyboard::Keyboard::Key(key))?;
        self.sync()?;
        std::thread::sleep(Duration::from_millis(10));
        self.dev.release(&keyboard::Keyboard::Key(key))?;
        self.sync()
    }

    /// Escribe un dígito decidido como pulsación de tecla.
    /// Un índice fuera de 0-9 se ignora en silencio.
    pub fn send_digit(&mut self, digit: usize) -> Result<(), uinput::Error> {
        debug_assert!(digit < NUM_CLASSES);
        match digit_key(digit) {
            Some(key) => self.key_tap(key),
            None => Ok(()),
        }
    }
}

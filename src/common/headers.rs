/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

/// Byte sink fed by canonicalizers and hashers.
pub trait Writer {
    fn write(&mut self, buf: &[u8]);
}

impl Writer for Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend_from_slice(buf);
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, buf: &[u8]) {
        (**self).write(buf);
    }
}
